//! 限时读取
//!
//! 每次尝试在独立任务中读取一行，超时则中止该任务并重试；
//! 对端关闭直接失败，不再重试；所有尝试都超时返回 `Ok(None)`。

use std::io;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::debug;

use protocol::{ProtocolError, Result, READ_ATTEMPTS, READ_TIMEOUT};

use crate::player::SharedReader;

/// 读取策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadPolicy {
    attempts: u32,
    timeout: Duration,
}

impl ReadPolicy {
    /// 尝试次数至少为 1
    pub fn new(attempts: u32, timeout: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            timeout,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// 最长等待时间
    pub fn budget(&self) -> Duration {
        self.timeout * self.attempts
    }
}

impl Default for ReadPolicy {
    fn default() -> Self {
        Self::new(READ_ATTEMPTS, READ_TIMEOUT)
    }
}

/// 函数返回时无条件中止读取任务
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// 按策略读取下一行
pub async fn read_line(reader: &SharedReader, policy: ReadPolicy) -> Result<Option<String>> {
    for attempt in 1..=policy.attempts {
        let shared = SharedReader::clone(reader);
        let mut task = AbortOnDrop(tokio::spawn(async move {
            let mut reader = shared.lock().await;
            reader.next_line().await
        }));

        match timeout(policy.timeout, &mut task.0).await {
            Ok(Ok(Ok(Some(line)))) => return Ok(Some(line)),
            Ok(Ok(Ok(None))) => return Err(ProtocolError::ConnectionClosed),
            Ok(Ok(Err(e))) => return Err(e),
            Ok(Err(e)) => return Err(ProtocolError::Io(io::Error::new(io::ErrorKind::Other, e))),
            Err(_) => {
                task.0.abort();
                // 等待任务真正结束，释放读端锁；已读入的字节留在缓冲区中
                let _ = (&mut task.0).await;
                debug!(attempt, attempts = policy.attempts, "读取超时");
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::PlayerLink;
    use tokio::io::AsyncWriteExt;

    fn link() -> (PlayerLink, tokio::io::DuplexStream) {
        let (client, server) = tokio::io::duplex(256);
        let (read, write) = tokio::io::split(server);
        (PlayerLink::new(read, write, "test"), client)
    }

    #[test]
    fn test_policy_clamps_attempts() {
        let policy = ReadPolicy::new(0, Duration::from_millis(10));
        assert_eq!(policy.attempts(), 1);
        assert_eq!(policy.budget(), Duration::from_millis(10));
        assert_eq!(ReadPolicy::default().timeout(), Duration::from_secs(90));
    }

    #[tokio::test]
    async fn test_reads_line() {
        let (link, mut client) = link();
        client.write_all(b"SKIP\n").await.unwrap();
        let policy = ReadPolicy::new(1, Duration::from_secs(1));
        let line = read_line(&link.reader(), policy).await.unwrap();
        assert_eq!(line.as_deref(), Some("SKIP"));
    }

    #[tokio::test]
    async fn test_exhausted_attempts_yield_none() {
        let (link, _client) = link();
        let policy = ReadPolicy::new(2, Duration::from_millis(30));
        let start = tokio::time::Instant::now();
        let line = read_line(&link.reader(), policy).await.unwrap();
        assert!(line.is_none());
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn test_closed_stream_is_fatal() {
        let (link, client) = link();
        drop(client);
        let policy = ReadPolicy::new(3, Duration::from_secs(1));
        let result = read_line(&link.reader(), policy).await;
        assert!(matches!(result, Err(ProtocolError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_partial_input_kept_across_attempts() {
        let (link, mut client) = link();
        client.write_all(b"MOVE,RRR6").await.unwrap();

        let policy = ReadPolicy::new(1, Duration::from_millis(30));
        assert!(read_line(&link.reader(), policy).await.unwrap().is_none());

        client.write_all(b",0,6\n").await.unwrap();
        let line = read_line(&link.reader(), policy).await.unwrap();
        assert_eq!(line.as_deref(), Some("MOVE,RRR6,0,6"));
    }

    #[tokio::test]
    async fn test_line_arriving_on_second_attempt() {
        let (link, mut client) = link();
        let policy = ReadPolicy::new(3, Duration::from_millis(40));
        let writer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(60)).await;
            client.write_all(b"SKIP\n").await.unwrap();
            client
        });
        let line = read_line(&link.reader(), policy).await.unwrap();
        assert_eq!(line.as_deref(), Some("SKIP"));
        writer.await.unwrap();
    }
}
