//! Notification fan-out queue.
//!
//! Notification writes and mention scans run here, off the request path.
//! Producers enqueue and return immediately; the worker runs each job in its
//! own task and logs failures at that boundary. Jobs still queued when the
//! process exits are dropped.

use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, error, info, warn};

use crate::services::mention::MentionResolver;
use crate::services::notification::{CreateNotificationInput, NotificationService};
use murmur_db::entities::notification::NotificationType;

/// Default number of jobs processed concurrently.
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Jobs processed by the fan-out worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    /// Persist a single notification.
    Notify(CreateNotificationInput),
    /// Resolve mentions in `text` and notify each mentioned actor.
    ScanMentions {
        author_id: String,
        post_id: String,
        comment_id: Option<String>,
        text: String,
    },
}

/// Producer handle for the fan-out queue.
#[derive(Clone)]
pub struct NotificationFanout {
    sender: mpsc::UnboundedSender<Job>,
}

impl NotificationFanout {
    /// Create a fan-out handle and the receiver a [`FanoutWorker`] consumes.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Job>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Enqueue a job without waiting for it to run.
    pub fn enqueue(&self, job: Job) {
        if self.sender.send(job).is_err() {
            warn!("Fan-out worker has stopped, dropping job");
        }
    }

    /// Enqueue a notification.
    pub fn notify(&self, input: CreateNotificationInput) {
        self.enqueue(Job::Notify(input));
    }

    /// Enqueue a mention scan.
    pub fn scan_mentions(
        &self,
        author_id: &str,
        post_id: &str,
        comment_id: Option<&str>,
        text: &str,
    ) {
        self.enqueue(Job::ScanMentions {
            author_id: author_id.to_string(),
            post_id: post_id.to_string(),
            comment_id: comment_id.map(String::from),
            text: text.to_string(),
        });
    }
}

/// Services a job needs.
#[derive(Clone)]
pub struct FanoutContext {
    /// Persists notifications.
    pub notification_service: NotificationService,
    /// Resolves mention tokens.
    pub mention_resolver: MentionResolver,
}

/// Consumes the fan-out queue.
pub struct FanoutWorker {
    receiver: mpsc::UnboundedReceiver<Job>,
    context: Arc<FanoutContext>,
    max_workers: usize,
}

impl FanoutWorker {
    /// Create a worker over `receiver`.
    #[must_use]
    pub fn new(
        receiver: mpsc::UnboundedReceiver<Job>,
        context: FanoutContext,
        max_workers: usize,
    ) -> Self {
        Self {
            receiver,
            context: Arc::new(context),
            max_workers: max_workers.max(1),
        }
    }

    /// Spawn the worker loop onto the runtime.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!("Fan-out worker starting with {} workers", self.max_workers);
            self.run().await;
            info!("Fan-out worker stopped");
        })
    }

    /// Process jobs until the queue closes.
    ///
    /// The queue closes once every [`NotificationFanout`] is dropped. The
    /// services in a server's [`FanoutContext`] hold one themselves, so there
    /// the loop only ends when its task is aborted.
    pub async fn run(mut self) {
        let semaphore = Arc::new(Semaphore::new(self.max_workers));

        while let Some(job) = self.receiver.recv().await {
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };
            let ctx = Arc::clone(&self.context);

            tokio::spawn(async move {
                let _permit = permit;
                process_job(job, &ctx).await;
            });
        }
    }
}

/// Process a single job.
pub async fn process_job(job: Job, context: &FanoutContext) {
    match job {
        Job::Notify(input) => process_notify(context, input).await,
        Job::ScanMentions {
            author_id,
            post_id,
            comment_id,
            text,
        } => process_mentions(context, &author_id, &post_id, comment_id.as_deref(), &text).await,
    }
}

async fn process_notify(context: &FanoutContext, input: CreateNotificationInput) {
    let notification_type = input.notification_type;
    let notifiee_id = input.notifiee_id.clone();

    match context.notification_service.create_notification(input).await {
        Ok(Some(n)) => {
            debug!(
                notification_id = %n.id,
                notifiee_id = %notifiee_id,
                notification_type = notification_type.as_str(),
                "Notification created"
            );
        }
        Ok(None) => {}
        Err(e) => {
            error!(
                notifiee_id = %notifiee_id,
                notification_type = notification_type.as_str(),
                error = %e,
                "Failed to create notification"
            );
        }
    }
}

async fn process_mentions(
    context: &FanoutContext,
    author_id: &str,
    post_id: &str,
    comment_id: Option<&str>,
    text: &str,
) {
    let mentioned = context.mention_resolver.resolve(text).await;

    for actor in mentioned {
        if actor.id == author_id {
            continue;
        }

        process_notify(
            context,
            CreateNotificationInput {
                notification_type: NotificationType::Mention,
                notifiee_id: actor.id,
                notifier_id: author_id.to_string(),
                post_id: Some(post_id.to_string()),
                comment_id: comment_id.map(String::from),
            },
        )
        .await;
    }
}
