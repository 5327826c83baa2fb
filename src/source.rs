//! Adapters that supply catalog identifiers to sync.

use std::{
   collections::HashSet,
   io::{self, Read},
   path::PathBuf,
};

use crate::Result;

/// Supplies the ordered, duplicate-free identifiers of the local catalog.
pub trait IdentifierSource {
   fn identifiers(&self) -> Result<Vec<String>>;
}

impl IdentifierSource for Vec<String> {
   fn identifiers(&self) -> Result<Vec<String>> {
      Ok(dedupe(self.iter().map(String::as_str)))
   }
}

/// Newline-delimited identifiers from a file, or stdin when no path is given.
///
/// Blank lines and `#` comments are skipped; duplicates keep their first
/// position.
#[derive(Debug, Clone, Default)]
pub struct LineSource {
   path: Option<PathBuf>,
}

impl LineSource {
   pub const fn file(path: PathBuf) -> Self {
      Self { path: Some(path) }
   }

   pub const fn stdin() -> Self {
      Self { path: None }
   }

   /// `-` selects stdin, anything else is a file path.
   pub fn from_arg(arg: Option<PathBuf>) -> Self {
      match arg {
         Some(path) if path.as_os_str() != "-" => Self::file(path),
         _ => Self::stdin(),
      }
   }
}

impl IdentifierSource for LineSource {
   fn identifiers(&self) -> Result<Vec<String>> {
      let text = match &self.path {
         Some(path) => std::fs::read_to_string(path)?,
         None => {
            let mut buf = String::new();
            io::stdin().lock().read_to_string(&mut buf)?;
            buf
         },
      };
      Ok(parse_identifiers(&text))
   }
}

pub fn parse_identifiers(text: &str) -> Vec<String> {
   dedupe(
      text
         .lines()
         .map(str::trim)
         .filter(|line| !line.is_empty() && !line.starts_with('#')),
   )
}

fn dedupe<'a>(ids: impl Iterator<Item = &'a str>) -> Vec<String> {
   let mut seen = HashSet::new();
   ids.filter(|id| seen.insert(*id)).map(str::to_string).collect()
}
