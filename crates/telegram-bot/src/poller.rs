//! Long-polling loop feeding updates to the dispatcher.

use crate::dispatcher::{self, BotContext};
use crate::error::{BotError, BotResult};
use crate::model::{required_int, Update};
use serde_json::Value;
use std::time::Duration;
use telegram_client::TelegramError;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Delay between two `getupdates` calls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Reply for unknown commands; `{command}` is replaced with the command name.
pub const DEFAULT_NOT_SUPPORTED_MESSAGE: &str = "That's not a valid command: /{command}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Running,
    ShuttingDown,
    Stopped,
}

/// Owns the update offset and drives fetching and dispatching.
pub struct PollLoop {
    bot: BotContext,
    /// Highest update id already handled.
    offset: i64,
    poll_interval: Duration,
    complain_about_invalid_commands: bool,
    command_not_supported_message: String,
    shutdown: CancellationToken,
    state: PollState,
}

impl PollLoop {
    /// Create a poll loop that stops once `shutdown` is cancelled.
    pub fn new(bot: BotContext, shutdown: CancellationToken) -> Self {
        Self {
            bot,
            offset: 1,
            poll_interval: DEFAULT_POLL_INTERVAL,
            complain_about_invalid_commands: false,
            command_not_supported_message: DEFAULT_NOT_SUPPORTED_MESSAGE.into(),
            shutdown,
            state: PollState::Running,
        }
    }

    /// Set the delay between polls.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Reply with `message` when a chat sends an unknown command.
    pub fn with_invalid_command_reply(mut self, message: impl Into<String>) -> Self {
        self.complain_about_invalid_commands = true;
        self.command_not_supported_message = message.into();
        self
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    /// Poll until shutdown is requested or the API reports a failure.
    ///
    /// Shutdown is only noticed between iterations, so a fetch or a running
    /// command always completes first.
    pub async fn run(&mut self) -> BotResult<()> {
        info!("Listening for updates...");

        while self.state == PollState::Running {
            if self.shutdown.is_cancelled() {
                self.state = PollState::ShuttingDown;
                break;
            }

            let cancelled = tokio::select! {
                _ = sleep(self.poll_interval) => false,
                _ = self.shutdown.cancelled() => true,
            };
            if cancelled {
                self.state = PollState::ShuttingDown;
                break;
            }

            if let Err(e) = self.poll_once().await {
                error!(error = %e, "Stopping poll loop");
                self.state = PollState::Stopped;
                return Err(e);
            }
        }

        info!("Shutting down..");
        self.state = PollState::Stopped;
        Ok(())
    }

    /// Fetch one batch and dispatch it in update id order.
    ///
    /// Returns how many updates were dispatched. Transport failures are
    /// logged and leave the offset alone; only an explicit API refusal is
    /// returned as an error.
    pub async fn poll_once(&mut self) -> BotResult<usize> {
        let records = match self.fetch().await {
            Ok(records) => records,
            Err(e @ BotError::Transport(_)) => {
                error!(error = %e, "Failed to fetch updates");
                return Ok(0);
            }
            Err(e) => return Err(e),
        };

        let mut updates = Vec::with_capacity(records.len());
        let mut newest: Option<i64> = None;

        for record in &records {
            match parse(record) {
                Ok(update) => {
                    newest = newest.max(Some(update.id));
                    updates.push(update);
                }
                Err(e) => {
                    // Still move past it so it is not fetched again.
                    let id = required_int(record, "update_id", "update_id").ok();
                    newest = newest.max(id);
                    warn!(update_id = ?id, error = %e, "Skipping malformed update");
                }
            }
        }

        updates.sort_by_key(|u| u.id);

        if let Some(newest) = newest {
            self.offset = self.offset.max(newest);
        }
        debug!(count = updates.len(), offset = self.offset, "Fetched updates");

        for update in &updates {
            self.dispatch(update).await;
        }

        Ok(updates.len())
    }

    async fn fetch(&self) -> BotResult<Vec<Value>> {
        let offset = self.offset.saturating_add(1);
        match self.bot.client().get_updates(offset).await {
            Ok(records) => Ok(records),
            Err(TelegramError::Api { description }) => Err(BotError::FatalApi(description)),
            Err(e) => Err(e.into()),
        }
    }

    async fn dispatch(&self, update: &Update) {
        match dispatcher::handle(update, &self.bot).await {
            Ok(()) => {}
            Err(BotError::CommandNotSupported(command)) => {
                debug!(update_id = update.id, "Unsupported command /{}", command);
                if !self.complain_about_invalid_commands {
                    return;
                }
                let Some(chat_id) = update.chat_id() else {
                    return;
                };
                let reply = self
                    .command_not_supported_message
                    .replace("{command}", &command);
                if let Err(e) = self.bot.send_message(chat_id, &reply).await {
                    warn!(chat_id, error = %e, "Failed to send unsupported command reply");
                }
            }
            Err(e) => {
                error!(update_id = update.id, error = %e, "Failed to handle update");
            }
        }
    }
}

fn parse(record: &Value) -> BotResult<Update> {
    Ok(Update::from_record(record)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;
    use crate::registry::{CommandHandler, CommandMap, CommandProvider, CommandRegistry};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};
    use telegram_client::TelegramClient;
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<i64>>,
    }

    #[async_trait]
    impl CommandHandler for Recorder {
        async fn call(
            &self,
            _args: &[String],
            _bot: &BotContext,
            update: &Update,
        ) -> anyhow::Result<()> {
            self.seen.lock().unwrap().push(update.id);
            Ok(())
        }
    }

    struct RecorderProvider(Arc<Recorder>);

    impl CommandProvider for RecorderProvider {
        fn name(&self) -> &str {
            "RecorderProvider"
        }

        fn command_map(&self) -> CommandMap {
            let mut map = CommandMap::new();
            map.insert("get".into(), self.0.clone() as Arc<dyn CommandHandler>);
            map
        }
    }

    fn poll_loop(server: &MockServer, recorder: Arc<Recorder>) -> PollLoop {
        let providers: Vec<Box<dyn CommandProvider>> = vec![Box::new(RecorderProvider(recorder))];
        let registry = CommandRegistry::build(&providers).unwrap();
        let client =
            TelegramClient::new(server.uri(), "test-token", Duration::from_secs(5)).unwrap();
        PollLoop::new(BotContext::new(Arc::new(registry), client), CancellationToken::new())
            .with_poll_interval(Duration::from_millis(10))
    }

    fn raw_update(id: i64, text: &str) -> Value {
        json!({
            "update_id": id,
            "message": {
                "message_id": id * 10,
                "chat": {"id": 10, "username": "alice"},
                "from": {"id": 10, "username": "alice"},
                "text": text
            }
        })
    }

    async fn mount_updates(server: &MockServer, result: Value) {
        Mock::given(method("GET"))
            .and(path("/bottest-token/getupdates"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": result})),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_batch_is_sorted_and_offset_advances() {
        let server = MockServer::start().await;
        mount_updates(&server, json!([raw_update(7, "/get b"), raw_update(6, "/get a")])).await;

        let recorder = Arc::new(Recorder::default());
        let mut poller = poll_loop(&server, recorder.clone());

        assert_eq!(poller.poll_once().await.unwrap(), 2);
        assert_eq!(*recorder.seen.lock().unwrap(), vec![6, 7]);
        assert_eq!(poller.offset(), 7);
    }

    #[tokio::test]
    async fn test_offset_is_requested_as_next_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bottest-token/getupdates"))
            .and(query_param("offset", "2"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": []})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut poller = poll_loop(&server, Arc::new(Recorder::default()));
        assert_eq!(poller.offset(), 1);
        poller.poll_once().await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_batch_keeps_offset() {
        let server = MockServer::start().await;
        mount_updates(&server, json!([raw_update(12, "hi")])).await;

        let mut poller = poll_loop(&server, Arc::new(Recorder::default()));
        poller.poll_once().await.unwrap();
        assert_eq!(poller.offset(), 12);

        server.reset().await;
        mount_updates(&server, json!([])).await;

        assert_eq!(poller.poll_once().await.unwrap(), 0);
        assert_eq!(poller.offset(), 12);
    }

    #[tokio::test]
    async fn test_malformed_update_is_skipped() {
        let server = MockServer::start().await;
        mount_updates(
            &server,
            json!([
                raw_update(3, "/get a"),
                {"update_id": 9, "message": {"chat": {"id": 1}, "from": {"id": 1}, "text": "/get"}},
                {"message": {"message_id": 1}},
                raw_update(4, "/get b")
            ]),
        )
        .await;

        let recorder = Arc::new(Recorder::default());
        let mut poller = poll_loop(&server, recorder.clone());

        assert_eq!(poller.poll_once().await.unwrap(), 2);
        assert_eq!(*recorder.seen.lock().unwrap(), vec![3, 4]);
        assert_eq!(poller.offset(), 9);
    }

    #[tokio::test]
    async fn test_transport_error_keeps_offset() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bottest-token/getupdates"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let mut poller = poll_loop(&server, Arc::new(Recorder::default()));
        assert!(matches!(poller.fetch().await, Err(BotError::Transport(_))));
        assert_eq!(poller.poll_once().await.unwrap(), 0);
        assert_eq!(poller.offset(), 1);
    }

    #[test]
    fn test_malformed_record_is_a_parse_error() {
        let err = parse(&json!({"message": {"message_id": 1}})).unwrap_err();
        assert!(matches!(err, BotError::Parse(ParseError::MissingField("update_id"))));
    }

    #[tokio::test]
    async fn test_offset_at_max_id_does_not_overflow() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bottest-token/getupdates"))
            .and(query_param("offset", i64::MAX.to_string()))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": []})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut poller = poll_loop(&server, Arc::new(Recorder::default()));
        poller.offset = i64::MAX;

        assert_eq!(poller.poll_once().await.unwrap(), 0);
        assert_eq!(poller.offset(), i64::MAX);
    }

    #[tokio::test]
    async fn test_api_failure_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bottest-token/getupdates"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"ok": false, "description": "Unauthorized"})),
            )
            .mount(&server)
            .await;

        let mut poller = poll_loop(&server, Arc::new(Recorder::default()));
        let err = poller.run().await.unwrap_err();

        assert!(matches!(err, BotError::FatalApi(ref d) if d == "Unauthorized"));
        assert_eq!(poller.state(), PollState::Stopped);
    }

    #[tokio::test]
    async fn test_unknown_command_is_silent_by_default() {
        let server = MockServer::start().await;
        mount_updates(&server, json!([raw_update(2, "/unknown")])).await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut poller = poll_loop(&server, Arc::new(Recorder::default()));
        assert_eq!(poller.poll_once().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unknown_command_complaint() {
        let server = MockServer::start().await;
        mount_updates(&server, json!([raw_update(2, "/unknown"), raw_update(3, "/get x")])).await;
        Mock::given(method("POST"))
            .and(path("/bottest-token/sendmessage"))
            .and(body_string_contains("unknown"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let recorder = Arc::new(Recorder::default());
        let mut poller = poll_loop(&server, recorder.clone())
            .with_invalid_command_reply(DEFAULT_NOT_SUPPORTED_MESSAGE);

        poller.poll_once().await.unwrap();
        assert_eq!(*recorder.seen.lock().unwrap(), vec![3]);
    }

    #[tokio::test]
    async fn test_cancelled_loop_stops_without_fetching() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut poller = poll_loop(&server, Arc::new(Recorder::default()));
        poller.shutdown.cancel();

        assert!(poller.run().await.is_ok());
        assert_eq!(poller.state(), PollState::Stopped);
    }

    #[tokio::test]
    async fn test_shutdown_after_some_iterations() {
        let server = MockServer::start().await;
        mount_updates(&server, json!([])).await;

        let mut poller = poll_loop(&server, Arc::new(Recorder::default()));
        let shutdown = poller.shutdown.clone();

        let handle = tokio::spawn(async move {
            let result = poller.run().await;
            (result.is_ok(), poller.state())
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown.cancel();

        let (ok, state) = handle.await.unwrap();
        assert!(ok);
        assert_eq!(state, PollState::Stopped);
        assert!(!server.received_requests().await.unwrap().is_empty());
    }
}
