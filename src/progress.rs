//! Per-chunk progress callbacks with cooperative cancellation.

use std::ops::ControlFlow;

use indicatif::ProgressBar;
use tokio_util::sync::CancellationToken;

/// Receives a callback after every chunk attempt, successful or not.
///
/// Returning [`ControlFlow::Break`] asks the controller to stop. The session
/// is then marked cancelled and never committed.
pub trait ProgressSink: Send {
   fn on_progress(&mut self, chunk_index: usize, total_chunks: usize, message: &str)
   -> ControlFlow<()>;
}

impl<F: FnMut(usize, usize, &str) -> ControlFlow<()> + Send> ProgressSink for F {
   fn on_progress(
      &mut self,
      chunk_index: usize,
      total_chunks: usize,
      message: &str,
   ) -> ControlFlow<()> {
      self(chunk_index, total_chunks, message)
   }
}

impl ProgressSink for () {
   fn on_progress(&mut self, _: usize, _: usize, _: &str) -> ControlFlow<()> {
      ControlFlow::Continue(())
   }
}

impl ProgressSink for ProgressBar {
   fn on_progress(
      &mut self,
      chunk_index: usize,
      total_chunks: usize,
      message: &str,
   ) -> ControlFlow<()> {
      self.set_length(total_chunks as u64);
      self.set_position((chunk_index + 1).min(total_chunks) as u64);
      self.set_message(message.to_string());
      ControlFlow::Continue(())
   }
}

impl ProgressSink for CancellationToken {
   fn on_progress(&mut self, _: usize, _: usize, _: &str) -> ControlFlow<()> {
      if self.is_cancelled() {
         ControlFlow::Break(())
      } else {
         ControlFlow::Continue(())
      }
   }
}

/// Wraps a sink so that an external token can also request cancellation.
pub struct Cancellable<S> {
   inner: S,
   token: CancellationToken,
}

impl<S: ProgressSink> Cancellable<S> {
   pub const fn new(inner: S, token: CancellationToken) -> Self {
      Self { inner, token }
   }

   pub fn into_inner(self) -> S {
      self.inner
   }
}

impl<S: ProgressSink> ProgressSink for Cancellable<S> {
   fn on_progress(
      &mut self,
      chunk_index: usize,
      total_chunks: usize,
      message: &str,
   ) -> ControlFlow<()> {
      let flow = self.inner.on_progress(chunk_index, total_chunks, message);
      if self.token.is_cancelled() {
         return ControlFlow::Break(());
      }
      flow
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn closure_sink_sees_arguments() {
      let mut seen = Vec::new();
      let mut sink = |i: usize, n: usize, msg: &str| {
         seen.push((i, n, msg.to_string()));
         ControlFlow::Continue(())
      };
      assert!(sink.on_progress(1, 4, "ok").is_continue());
      drop(sink);
      assert_eq!(seen, vec![(1, 4, "ok".to_string())]);
   }

   #[test]
   fn token_breaks_once_cancelled() {
      let mut token = CancellationToken::new();
      assert!(token.on_progress(0, 1, "").is_continue());
      token.cancel();
      assert!(token.on_progress(0, 1, "").is_break());
   }

   #[test]
   fn cancellable_still_forwards_to_inner() {
      let token = CancellationToken::new();
      let mut calls = 0usize;
      {
         let mut sink = Cancellable::new(
            |_: usize, _: usize, _: &str| {
               calls += 1;
               ControlFlow::Continue(())
            },
            token.clone(),
         );
         assert!(sink.on_progress(0, 2, "a").is_continue());
         token.cancel();
         assert!(sink.on_progress(1, 2, "b").is_break());
      }
      assert_eq!(calls, 2);
   }

   #[test]
   fn progress_bar_tracks_position() {
      let mut bar = ProgressBar::hidden();
      let _ = bar.on_progress(2, 5, "chunk 3/5");
      assert_eq!(bar.length(), Some(5));
      assert_eq!(bar.position(), 3);
   }
}
