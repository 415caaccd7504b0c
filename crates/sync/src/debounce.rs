//! Trailing-edge debouncer.
//!
//! Values pushed in quick succession collapse into one output, emitted
//! once no new value has arrived for the configured delay.

use std::time::Duration;

use tokio::sync::watch;

pub struct Debouncer<T> {
    input: watch::Sender<T>,
    output: watch::Receiver<T>,
    task: tokio::task::JoinHandle<()>,
}

impl<T> Debouncer<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Start a debouncer. Must be called from within a Tokio runtime.
    pub fn new(initial: T, delay: Duration) -> Self {
        let (input, mut input_rx) = watch::channel(initial.clone());
        let (output_tx, output) = watch::channel(initial);

        let task = tokio::spawn(async move {
            while input_rx.changed().await.is_ok() {
                // Restart the timer on every new value.
                loop {
                    tokio::select! {
                        changed = input_rx.changed() => {
                            if changed.is_err() {
                                return;
                            }
                        }
                        _ = tokio::time::sleep(delay) => break,
                    }
                }

                let value = input_rx.borrow_and_update().clone();
                output_tx.send_if_modified(|current| {
                    if *current == value {
                        false
                    } else {
                        *current = value;
                        true
                    }
                });
            }
        });

        Self {
            input,
            output,
            task,
        }
    }

    pub fn push(&self, value: T) {
        self.input.send_replace(value);
    }

    /// Last settled value.
    pub fn current(&self) -> T {
        self.output.borrow().clone()
    }

    /// Wait for the next settled value that differs from the last one.
    pub async fn settled(&mut self) -> Option<T> {
        self.output.changed().await.ok()?;
        Some(self.output.borrow_and_update().clone())
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(500);

    #[tokio::test(start_paused = true)]
    async fn burst_collapses_to_last_value() {
        let debouncer = Debouncer::new(String::new(), DELAY);

        debouncer.push("a".to_string());
        tokio::time::sleep(Duration::from_millis(100)).await;
        debouncer.push("ad".to_string());
        tokio::time::sleep(Duration::from_millis(100)).await;
        debouncer.push("ada".to_string());

        tokio::time::sleep(Duration::from_millis(450)).await;
        assert_eq!(debouncer.current(), "");

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(debouncer.current(), "ada");
    }

    #[tokio::test(start_paused = true)]
    async fn settled_yields_each_distinct_value() {
        let mut debouncer = Debouncer::new(0u32, DELAY);

        debouncer.push(1);
        assert_eq!(debouncer.settled().await, Some(1));

        debouncer.push(2);
        tokio::time::sleep(Duration::from_millis(10)).await;
        debouncer.push(3);
        assert_eq!(debouncer.settled().await, Some(3));
    }
}
