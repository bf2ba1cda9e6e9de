//! ラベル値のパーサー・正規化
//!
//! - abv: アルコール度数（% / Proof）
//! - volume: 内容量（単位換算してmL合計）
//! - address: 製造者名・住所
//! - country: 原産国

pub mod abv;
pub mod volume;
pub mod address;
pub mod country;

pub use abv::{parse_abv, Abv, AbvSource};
pub use address::{normalize_address, AddressNormalizer};
pub use country::{normalize_country, CountryResolution, CountryResolver, CountryRule};
pub use volume::{parse_volume_ml, volumes_equivalent, VolumeParser, VOLUME_TOLERANCE};
