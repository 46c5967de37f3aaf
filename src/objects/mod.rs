//! 对象文本提取模块：把领域对象转换为待向量化的文本。
//!
//! # Object Text Extraction
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`Object`] | Class name plus JSON properties |
//! | [`ClassSettings`] | Per-class extraction settings and provider configuration |
//! | [`TextExtractor`] | Trait for object → text conversion |
//! | [`ObjectTextExtractor`] | Default extraction (class name, sorted string properties) |

mod extractor;
mod settings;

pub use extractor::{Object, ObjectTextExtractor, TextExtractor};
pub use settings::{ClassSettings, PropertySettings};
