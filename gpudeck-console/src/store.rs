//! Cross-page cache: a few slices, each with exactly one writer.

use gpudeck_common::{NpsResponse, Template};
use std::collections::BTreeSet;
use tokio::sync::watch;

pub struct Slice;

impl Slice {
    pub fn new<T>(initial: T) -> (SliceWriter<T>, SliceReader<T>) {
        let (tx, rx) = watch::channel(initial);
        (SliceWriter { tx }, SliceReader { rx })
    }
}

/// The single producer of a slice. Deliberately not `Clone`.
pub struct SliceWriter<T> {
    tx: watch::Sender<T>,
}

impl<T> SliceWriter<T> {
    pub fn publish(&self, value: T) {
        self.tx.send_replace(value);
    }

    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.tx.send_modify(f);
    }

    pub fn reader(&self) -> SliceReader<T> {
        SliceReader {
            rx: self.tx.subscribe(),
        }
    }
}

#[derive(Clone)]
pub struct SliceReader<T> {
    rx: watch::Receiver<T>,
}

impl<T: Clone> SliceReader<T> {
    pub fn get(&self) -> T {
        self.rx.borrow().clone()
    }
}

impl<T> SliceReader<T> {
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.rx.borrow())
    }

    /// Wait for the next publish. Errors once the writer is gone.
    pub async fn changed(&mut self) -> Result<(), watch::error::RecvError> {
        self.rx.changed().await
    }
}

/// Writers handed out once, at store creation.
pub struct StoreWriters {
    pub nps: SliceWriter<Vec<NpsResponse>>,
    pub templates: SliceWriter<Vec<Template>>,
    pub racing_instance_ids: SliceWriter<BTreeSet<i64>>,
}

/// Read side of the shared slices.
#[derive(Clone)]
pub struct ConsoleStore {
    pub nps: SliceReader<Vec<NpsResponse>>,
    pub templates: SliceReader<Vec<Template>>,
    pub racing_instance_ids: SliceReader<BTreeSet<i64>>,
}

impl ConsoleStore {
    pub fn new() -> (ConsoleStore, StoreWriters) {
        let (nps_w, nps) = Slice::new(Vec::new());
        let (templates_w, templates) = Slice::new(Vec::new());
        let (racing_w, racing_instance_ids) = Slice::new(BTreeSet::new());
        (
            ConsoleStore {
                nps,
                templates,
                racing_instance_ids,
            },
            StoreWriters {
                nps: nps_w,
                templates: templates_w,
                racing_instance_ids: racing_w,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readers_see_published_values() {
        let (w, r) = Slice::new(0u32);
        let r2 = r.clone();
        w.publish(3);
        assert_eq!(r.get(), 3);
        w.update(|v| *v += 1);
        assert_eq!(r2.get(), 4);
        assert_eq!(w.reader().get(), 4);
    }

    #[tokio::test]
    async fn changed_wakes_and_then_errors_when_writer_drops() {
        let (w, mut r) = Slice::new(String::new());
        w.publish("x".into());
        r.changed().await.unwrap();
        assert_eq!(r.with(|s| s.len()), 1);
        drop(w);
        assert!(r.changed().await.is_err());
    }

    #[test]
    fn store_starts_empty() {
        let (store, writers) = ConsoleStore::new();
        writers.racing_instance_ids.update(|ids| {
            ids.insert(7);
        });
        assert!(store.nps.get().is_empty());
        assert!(store.racing_instance_ids.get().contains(&7));
    }
}
