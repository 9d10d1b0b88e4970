//! Paged result streams
//!
//! A producer task reads a store cursor and sends pages of at most
//! `page_size` items into a channel holding `stream_buffer` pages. When the
//! channel is full the producer waits, so the cursor is never read further
//! ahead than the consumer allows. When the consumer drops its
//! [`PageStream`] the next send fails and the producer stops.

use std::mem;

use tokio::sync::mpsc;

use super::config::AdapterConfig;
use super::errors::{AdapterError, AdapterResult};

/// Consumer end of a paged result stream.
///
/// Yields `Ok(page)` items and at most one trailing `Err`, after which the
/// stream ends.
#[derive(Debug)]
pub struct PageStream<T> {
    receiver: mpsc::Receiver<AdapterResult<Vec<T>>>,
}

impl<T> PageStream<T> {
    /// Next page, `None` once the producer has finished
    pub async fn next_page(&mut self) -> Option<AdapterResult<Vec<T>>> {
        self.receiver.recv().await
    }

    /// Drain every page. Rows received before an error are discarded.
    pub async fn collect_all(mut self) -> AdapterResult<Vec<T>> {
        let mut items = Vec::new();
        while let Some(page) = self.next_page().await {
            items.extend(page?);
        }
        Ok(items)
    }
}

/// The consumer went away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Closed;

/// Producer end: accumulates items and sends them a page at a time
#[derive(Debug)]
pub(crate) struct PageSender<T> {
    sender: mpsc::Sender<AdapterResult<Vec<T>>>,
    page: Vec<T>,
    page_size: usize,
    sent: u64,
}

impl<T> PageSender<T> {
    pub(crate) async fn push(&mut self, item: T) -> Result<(), Closed> {
        self.page.push(item);
        if self.page.len() >= self.page_size {
            self.flush().await
        } else {
            Ok(())
        }
    }

    pub(crate) async fn flush(&mut self) -> Result<(), Closed> {
        if self.page.is_empty() {
            return Ok(());
        }
        let page = mem::replace(&mut self.page, Vec::with_capacity(self.page_size));
        let len = page.len() as u64;
        self.sender.send(Ok(page)).await.map_err(|_| Closed)?;
        self.sent += len;
        Ok(())
    }

    /// Send what is buffered, then the error that ends the stream
    pub(crate) async fn fail(mut self, err: AdapterError) -> Result<(), Closed> {
        self.flush().await?;
        self.sender.send(Err(err)).await.map_err(|_| Closed)
    }

    /// Items delivered so far
    pub(crate) fn sent(&self) -> u64 {
        self.sent
    }
}

pub(crate) fn page_channel<T>(config: &AdapterConfig) -> (PageSender<T>, PageStream<T>) {
    let page_size = config.page_size.max(1);
    let (sender, receiver) = mpsc::channel(config.stream_buffer.max(1));
    (
        PageSender {
            sender,
            page: Vec::with_capacity(page_size),
            page_size,
            sent: 0,
        },
        PageStream { receiver },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(page_size: usize, stream_buffer: usize) -> AdapterConfig {
        AdapterConfig {
            page_size,
            stream_buffer,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_pages_are_bounded() {
        let (mut sender, mut stream) = page_channel(&config(2, 8));
        for i in 0..5 {
            sender.push(i).await.unwrap();
        }
        sender.flush().await.unwrap();
        assert_eq!(sender.sent(), 5);
        drop(sender);

        assert_eq!(stream.next_page().await.unwrap().unwrap(), vec![0, 1]);
        assert_eq!(stream.next_page().await.unwrap().unwrap(), vec![2, 3]);
        assert_eq!(stream.next_page().await.unwrap().unwrap(), vec![4]);
        assert!(stream.next_page().await.is_none());
    }

    #[tokio::test]
    async fn test_error_follows_buffered_rows() {
        let (mut sender, mut stream) = page_channel(&config(10, 4));
        sender.push("a").await.unwrap();
        sender.fail(AdapterError::NotSupported).await.unwrap();

        assert_eq!(stream.next_page().await.unwrap().unwrap(), vec!["a"]);
        assert!(stream.next_page().await.unwrap().is_err());
        assert!(stream.next_page().await.is_none());
    }

    #[tokio::test]
    async fn test_dropped_consumer_is_reported() {
        let (mut sender, stream) = page_channel(&config(1, 1));
        drop(stream);
        assert_eq!(sender.push(1).await, Err(Closed));
    }

    #[tokio::test]
    async fn test_full_channel_blocks_producer() {
        let (mut sender, mut stream) = page_channel(&config(1, 1));
        sender.push(1).await.unwrap();

        let blocked = tokio::time::timeout(std::time::Duration::from_millis(20), sender.push(2)).await;
        assert!(blocked.is_err());

        assert_eq!(stream.next_page().await.unwrap().unwrap(), vec![1]);
    }
}
