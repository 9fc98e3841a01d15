use futures::{Future, future::select, pin_mut};
use tokio::{sync::oneshot, task::JoinHandle};
use tokio::task;
use futures::future::Either;

#[derive(Debug)]
pub enum TaskResult {
    Terminated,
}

pub struct KillableTask<T> {
    kill_sender: Option<oneshot::Sender<()>>,
    join_handler: JoinHandle<Result<T, TaskResult>>,
}

impl<T> KillableTask<T> where T: Send + 'static {
    pub fn new(task: impl Future<Output=T> + Send + 'static) -> Self {
        let (sender, receiver) = oneshot::channel::<()>();
        Self {
            kill_sender: Some(sender),
            join_handler: task::spawn(Self::run_task(task, receiver))
        }
    }

    pub fn kill(&mut self) {
        if let Some(sender) = self.kill_sender.take() {
            let _ = sender.send(());
        }
    }

    pub async fn join(self) -> Result<T, TaskResult> {
        match self.join_handler.await {
            Ok(result) => result,
            Err(_) => Err(TaskResult::Terminated),
        }
    }

    async fn run_task(task: impl Future<Output=T> + Send, kill_receiver: oneshot::Receiver<()>) -> Result<T, TaskResult> {
        pin_mut!(task, kill_receiver);

        let result = select(task, kill_receiver).await;
        match result {
            Either::Left((result, _)) => Ok(result),
            Either::Right(_) => Err(TaskResult::Terminated),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_killable_task() {
        let task = KillableTask::new(async {
            sleep(Duration::from_millis(10)).await;
            42
        });
        assert!(matches!(task.join().await, Ok(42)));

        let mut task = KillableTask::new(async {
            sleep(Duration::from_secs(60)).await;
            42
        });
        task.kill();
        assert!(matches!(task.join().await, Err(TaskResult::Terminated)));
    }
}
