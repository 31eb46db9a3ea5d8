// ConversationHub: routes live messages through moderation.
//
// Each hub owns its own participant registry; nothing is global, so any
// number of hubs can run side by side.
//
// Ordering: every sender gets a dispatcher task fed by an unbounded FIFO.
// `submit` echoes to the sender, spawns the moderation task right away
// (so scoring and rephrasing of consecutive messages overlap), and queues
// the task handle. The dispatcher awaits handles strictly in queue order,
// so receivers see message N before N+1 no matter which finished first.
//
// Disconnect: removing a sender drops its queue handle. The dispatcher
// still drains what was already queued and delivers to whoever is
// connected at that point, then exits.

pub mod frames;

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::moderation::{Decision, ModerationPipeline};
pub use frames::{ConnectionState, Frame, Message, ParticipantId, Role};

/// Routing failures. These are reported to the caller that submitted the
/// message and never reach the moderation pipeline.
#[derive(Debug, Error, PartialEq)]
pub enum HubError {
    #[error("participant {0} is not connected")]
    UnknownParticipant(ParticipantId),
    #[error("participant {0} is not a sender")]
    NotASender(ParticipantId),
    #[error("message is empty")]
    EmptyMessage,
}

/// A registered connection: its id, role, and the stream of frames the hub
/// pushes to it. Dropping `frames` makes future sends to it no-ops.
pub struct Connection {
    pub id: ParticipantId,
    pub role: Role,
    pub frames: mpsc::UnboundedReceiver<Frame>,
}

/// Live participant counts by role.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct ParticipantCounts {
    pub senders: usize,
    pub receivers: usize,
    pub moderators: usize,
}

struct Pending {
    message: Message,
    decision: JoinHandle<Decision>,
}

struct Participant {
    role: Role,
    outbound: mpsc::UnboundedSender<Frame>,
    /// Present for senders only.
    queue: Option<mpsc::UnboundedSender<Pending>>,
}

struct HubInner {
    pipeline: Arc<ModerationPipeline>,
    participants: RwLock<HashMap<ParticipantId, Participant>>,
}

#[derive(Clone)]
pub struct ConversationHub {
    inner: Arc<HubInner>,
}

impl ConversationHub {
    pub fn new(pipeline: Arc<ModerationPipeline>) -> Self {
        Self {
            inner: Arc::new(HubInner {
                pipeline,
                participants: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Register a new connection under `role`. The connection is Open when
    /// this returns.
    pub async fn connect(&self, role: Role) -> Connection {
        let id = Uuid::new_v4();
        let (outbound, frames) = mpsc::unbounded_channel();

        let queue = (role == Role::Sender).then(|| {
            let (tx, rx) = mpsc::unbounded_channel();
            tokio::spawn(dispatch(Arc::clone(&self.inner), id, rx));
            tx
        });

        self.inner.participants.write().await.insert(
            id,
            Participant {
                role,
                outbound,
                queue,
            },
        );

        info!(participant = %id, %role, "Participant connected");
        Connection { id, role, frames }
    }

    /// Remove a participant from routing. Messages it already submitted
    /// are still moderated and delivered.
    pub async fn disconnect(&self, id: ParticipantId) {
        if let Some(participant) = self.inner.participants.write().await.remove(&id) {
            info!(participant = %id, role = %participant.role, "Participant disconnected");
        }
    }

    pub async fn state(&self, id: ParticipantId) -> ConnectionState {
        if self.inner.participants.read().await.contains_key(&id) {
            ConnectionState::Open
        } else {
            ConnectionState::Closed
        }
    }

    /// Accept a message from a sender: echo it back immediately, exactly as
    /// sent, and start moderation. The pipeline trims surrounding whitespace,
    /// so receivers get the trimmed text. Returns the constructed message.
    pub async fn submit(&self, sender_id: ParticipantId, text: &str) -> Result<Message, HubError> {
        if text.trim().is_empty() {
            return Err(HubError::EmptyMessage);
        }

        let participants = self.inner.participants.read().await;
        let participant = participants
            .get(&sender_id)
            .ok_or(HubError::UnknownParticipant(sender_id))?;
        let queue = participant
            .queue
            .as_ref()
            .ok_or(HubError::NotASender(sender_id))?;

        let message = Message::new(sender_id, text);

        // A closed echo channel means the sender's socket is going away;
        // the message is still delivered to receivers.
        let _ = participant.outbound.send(Frame::echo(&message));

        let pipeline = Arc::clone(&self.inner.pipeline);
        let to_moderate = message.text.clone();
        let decision = tokio::spawn(async move { pipeline.moderate(&to_moderate).await });

        if queue
            .send(Pending {
                message: message.clone(),
                decision,
            })
            .is_err()
        {
            // Dispatcher only exits after the queue sender is dropped, which
            // happens on disconnect, and we hold the registry lock here.
            error!(participant = %sender_id, "Dispatcher for sender has stopped");
        }

        debug!(participant = %sender_id, message = %message.id, "Message accepted");
        Ok(message)
    }

    pub async fn counts(&self) -> ParticipantCounts {
        let participants = self.inner.participants.read().await;
        let mut counts = ParticipantCounts::default();
        for participant in participants.values() {
            match participant.role {
                Role::Sender => counts.senders += 1,
                Role::Receiver => counts.receivers += 1,
                Role::Moderator => counts.moderators += 1,
            }
        }
        counts
    }
}

/// Per-sender dispatcher: deliver decisions in submission order.
async fn dispatch(
    hub: Arc<HubInner>,
    sender_id: ParticipantId,
    mut queue: mpsc::UnboundedReceiver<Pending>,
) {
    while let Some(Pending { message, decision }) = queue.recv().await {
        match decision.await {
            Ok(decision) => hub.deliver(&message, &decision).await,
            // Nothing is delivered for this message; sending the raw text
            // could leak toxic content.
            Err(e) => error!(
                participant = %sender_id,
                message = %message.id,
                error = %e,
                "Moderation task failed, message dropped"
            ),
        }
    }
    debug!(participant = %sender_id, "Dispatcher finished");
}

impl HubInner {
    async fn deliver(&self, message: &Message, decision: &Decision) {
        let participants = self.participants.read().await;

        let mut receivers = 0;
        for (id, participant) in participants.iter() {
            let frame = match participant.role {
                Role::Receiver => {
                    receivers += 1;
                    Frame::delivery(message, decision)
                }
                Role::Moderator => Frame::audit(message, decision),
                Role::Sender => continue,
            };
            if participant.outbound.send(frame).is_err() {
                debug!(participant = %id, "Outbound channel closed, frame dropped");
            }
        }

        if receivers == 0 {
            debug!(message = %message.id, "No receivers connected, decision discarded");
        } else {
            debug!(
                message = %message.id,
                receivers,
                moderated = decision.is_toxic,
                "Decision delivered"
            );
        }
    }
}
