pub mod client;
pub mod server;

use client::*;
use server::*;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "session.start")]
    SessionStart(SessionStartEvent),
    #[serde(rename = "task.speak")]
    TaskSpeak(TaskSpeakEvent),
    #[serde(rename = "task.interrupt")]
    TaskInterrupt(TaskInterruptEvent),
    #[serde(rename = "session.stop")]
    SessionStop(SessionStopEvent),
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "close")]
    Close {
        reason: Option<String>,
    },
    #[serde(rename = "error")]
    Error(ErrorEvent),
    #[serde(rename = "session.created")]
    SessionCreated(SessionCreatedEvent),
    #[serde(rename = "stream.ready")]
    StreamReady(StreamReadyEvent),
    #[serde(rename = "stream.disconnected")]
    StreamDisconnected(StreamDisconnectedEvent),
    #[serde(rename = "task.started")]
    TaskStarted(TaskStartedEvent),
    #[serde(rename = "task.finished")]
    TaskFinished(TaskFinishedEvent),
    #[serde(rename = "task.interrupted")]
    TaskInterrupted(TaskInterruptedEvent),
    #[serde(rename = "session.stopped")]
    SessionStopped(SessionStoppedEvent),
}
