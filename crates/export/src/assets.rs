//! Templates embedded into the binary at compile time using
//! [`rust-embed`](rust_embed).

use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use rust_embed::Embed;

#[derive(Embed)]
#[folder = "../../assets/templates/"]
pub(crate) struct Builtins;
impl Builtins {
    /// Loads a builtin template by file name as UTF-8 text.
    pub(crate) fn template(name: &str) -> Result<String> {
        let file = Self::get(name).ok_or_raise(|| ErrorKind::AssetNotFound(format!("builtin:{name}")))?;
        String::from_utf8(file.data.into_owned()).or_raise(|| ErrorKind::Template)
    }
}
