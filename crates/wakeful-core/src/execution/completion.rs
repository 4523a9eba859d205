//! CompletionHandler - backend に「実行終了」を伝えるコールバック
//!
//! backend が発火ごとに渡してくる。wake lock などの資源はこれを呼ぶまで解放されない。
//! `finish(self)` は self を消費するので、同じ handler を 2 回呼ぶことは型で防がれる。

use std::fmt;

/// One-shot completion signal for a fired event.
pub struct CompletionHandler {
    inner: Box<dyn FnOnce() + Send + 'static>,
}

impl CompletionHandler {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self { inner: Box::new(f) }
    }

    /// A handler that does nothing (alarm deliveries have nothing to release).
    pub fn noop() -> Self {
        Self::new(|| {})
    }

    pub fn finish(self) {
        (self.inner)()
    }
}

impl fmt::Debug for CompletionHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CompletionHandler")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn finish_runs_the_callback() {
        let calls = Arc::new(AtomicU32::new(0));
        let handler = CompletionHandler::new({
            let calls = calls.clone();
            move || {
                calls.fetch_add(1, Ordering::SeqCst);
            }
        });

        handler.finish();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
