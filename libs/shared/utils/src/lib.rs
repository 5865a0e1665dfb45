pub mod encryption;
pub mod test_utils;

pub use encryption::{mask, mask_phone, AesGcmEncryptor, CryptoError, Encryptor};
