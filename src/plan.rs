//! Splits an identifier list into bounded, ordered chunks.

use uuid::Uuid;

use crate::types::ItemRecord;

/// Largest chunk the server accepts.
pub const MAX_CHUNK_SIZE: usize = 1000;

/// A contiguous slice of the catalog, uploaded in one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
   index:           usize,
   items:           Vec<ItemRecord>,
   idempotency_key: String,
}

impl Chunk {
   pub fn new(index: usize, items: Vec<ItemRecord>) -> Self {
      Self { index, items, idempotency_key: new_idempotency_key() }
   }

   pub const fn index(&self) -> usize {
      self.index
   }

   pub fn items(&self) -> &[ItemRecord] {
      &self.items
   }

   /// Key replayed on every attempt of this chunk.
   pub fn idempotency_key(&self) -> &str {
      &self.idempotency_key
   }

   pub fn len(&self) -> usize {
      self.items.len()
   }

   pub fn is_empty(&self) -> bool {
      self.items.is_empty()
   }

   /// Swaps the chunk's content. The key is regenerated only if the content
   /// actually differs.
   pub fn replace_items(&mut self, items: Vec<ItemRecord>) {
      if items != self.items {
         self.items = items;
         self.idempotency_key = new_idempotency_key();
      }
   }
}

pub fn new_idempotency_key() -> String {
   Uuid::new_v4().to_string()
}

pub fn clamp_chunk_size(chunk_size: usize) -> usize {
   chunk_size.clamp(1, MAX_CHUNK_SIZE)
}

/// Partitions `identifiers` into chunks of at most `chunk_size` (clamped to
/// `1..=1000`), preserving order. Empty input yields an empty plan.
pub fn plan<S: AsRef<str>>(identifiers: &[S], chunk_size: usize) -> Vec<Chunk> {
   let size = clamp_chunk_size(chunk_size);
   identifiers
      .chunks(size)
      .enumerate()
      .map(|(index, slice)| {
         let items = slice.iter().map(|id| ItemRecord::new(id.as_ref())).collect();
         Chunk::new(index, items)
      })
      .collect()
}
