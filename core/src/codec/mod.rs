//! Image decoding, encoding, and mime sniffing.

pub mod image;
pub mod sniff;

pub use self::image::{DecodedImage, decode, encode_jpeg};
pub use sniff::detect;

pub type Result<T> = crate::Result<T>;
