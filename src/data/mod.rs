//! Dataset decoding and loading

pub mod decode;
pub mod loader;

pub use decode::{decoder_for_path, DatasetDecoder, PlainCsv, SealedCsv, DATA_KEY_ENV, SEALED_EXTENSION};
pub use loader::{column_to_labels, columns_to_array2, DatasetInfo, DatasetLoader, TargetLabels};
