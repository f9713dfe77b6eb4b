use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::directory::{Project, User, UserType};
use crate::mail::{Mailer, OutgoingMail};
use crate::roster::{Assignment, RoleKind};
use crate::store::{AssignmentFilter, AssignmentStore, Directory, StoreError};

pub const GLOBAL_BROADCAST_SUBJECT: &str = "Important announcement for all InternHub projects";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    MemberAdded {
        project_id: Uuid,
        user_id: Uuid,
        role: RoleKind,
        actor_id: Uuid,
    },
    ProjectBroadcast {
        project_id: Uuid,
        subject: Option<String>,
        body: String,
        actor_id: Uuid,
    },
    GlobalBroadcast {
        subject: Option<String>,
        body: String,
    },
}

#[derive(Clone)]
pub struct Notifier {
    sender: mpsc::Sender<NotificationEvent>,
}

impl Notifier {
    /// Queues the event, returning `false` when it was dropped because the
    /// queue is full or the worker has stopped.
    pub fn submit(&self, event: NotificationEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                warn!(?event, "notification queue full; event dropped");
                false
            }
            Err(TrySendError::Closed(event)) => {
                warn!(?event, "notification worker stopped; event dropped");
                false
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum FanoutError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("project {0} not found")]
    MissingProject(Uuid),
    #[error("project {0} has no assignment")]
    MissingAssignment(Uuid),
    #[error("user {0} not found")]
    MissingUser(Uuid),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TeamMember {
    name: String,
    email: String,
    role: RoleKind,
}

pub struct NotificationDispatcher;

impl NotificationDispatcher {
    pub fn new(
        capacity: usize,
        store: Arc<dyn AssignmentStore>,
        directory: Arc<dyn Directory>,
        mailer: Arc<dyn Mailer>,
        delivery_timeout: Duration,
    ) -> (Notifier, FanoutWorker) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            Notifier { sender },
            FanoutWorker {
                receiver,
                store,
                directory,
                mailer,
                delivery_timeout,
            },
        )
    }
}

pub struct FanoutWorker {
    receiver: mpsc::Receiver<NotificationEvent>,
    store: Arc<dyn AssignmentStore>,
    directory: Arc<dyn Directory>,
    mailer: Arc<dyn Mailer>,
    delivery_timeout: Duration,
}

impl FanoutWorker {
    pub async fn run(mut self) {
        info!("notification worker started");
        while let Some(event) = self.receiver.recv().await {
            if let Err(err) = self.handle(event).await {
                warn!(error = %err, "notification event skipped");
            }
        }
        info!("notification worker stopped");
    }

    pub async fn handle(&self, event: NotificationEvent) -> Result<Vec<JoinHandle<()>>, FanoutError> {
        let mails = match event {
            NotificationEvent::MemberAdded {
                project_id,
                user_id,
                role,
                actor_id,
            } => self.member_added(project_id, user_id, role, actor_id).await?,
            NotificationEvent::ProjectBroadcast {
                project_id,
                subject,
                body,
                actor_id,
            } => {
                self.project_broadcast(project_id, subject, body, actor_id)
                    .await?
            }
            NotificationEvent::GlobalBroadcast { subject, body } => {
                self.global_broadcast(subject, body).await?
            }
        };
        Ok(self.deliver(mails))
    }

    async fn authorized_context(
        &self,
        project_id: Uuid,
        actor_id: Uuid,
    ) -> Result<Option<(Project, Assignment)>, FanoutError> {
        let project = self
            .directory
            .project(project_id)
            .await?
            .ok_or(FanoutError::MissingProject(project_id))?;
        let actor = self
            .directory
            .user(actor_id)
            .await?
            .ok_or(FanoutError::MissingUser(actor_id))?;

        let permitted = actor.user_type == UserType::Admin
            || (actor.user_type == UserType::Hr
                && actor.company.as_deref() == Some(project.company.as_str()));
        if !permitted {
            warn!(
                %project_id,
                %actor_id,
                actor_type = %actor.user_type,
                "actor may not notify this project's members; skipping"
            );
            return Ok(None);
        }

        let assignment = self
            .store
            .find_by_project(project_id)
            .await?
            .ok_or(FanoutError::MissingAssignment(project_id))?;
        Ok(Some((project, assignment)))
    }

    async fn team(&self, assignment: &Assignment) -> Result<Vec<TeamMember>, FanoutError> {
        let roles: Vec<(Uuid, RoleKind)> = assignment
            .members()
            .map(|(role, member)| (member.user_id, role))
            .collect();
        let ids: Vec<Uuid> = roles.iter().map(|(id, _)| *id).collect();
        let users: HashMap<Uuid, User> = self
            .directory
            .users(&ids)
            .await?
            .into_iter()
            .map(|user| (user.id, user))
            .collect();

        Ok(roles
            .into_iter()
            .filter_map(|(id, role)| {
                users.get(&id).and_then(|user| {
                    (!user.email.is_empty() && !user.name.is_empty()).then(|| TeamMember {
                        name: user.name.clone(),
                        email: user.email.clone(),
                        role,
                    })
                })
            })
            .collect())
    }

    async fn member_added(
        &self,
        project_id: Uuid,
        user_id: Uuid,
        role: RoleKind,
        actor_id: Uuid,
    ) -> Result<Vec<OutgoingMail>, FanoutError> {
        let Some((project, assignment)) = self.authorized_context(project_id, actor_id).await?
        else {
            return Ok(Vec::new());
        };
        let newcomer = self
            .directory
            .user(user_id)
            .await?
            .ok_or(FanoutError::MissingUser(user_id))?;
        let team = self.team(&assignment).await?;

        let mut recipients = team.clone();
        if !recipients.iter().any(|member| member.email == newcomer.email) {
            recipients.push(TeamMember {
                name: newcomer.name.clone(),
                email: newcomer.email.clone(),
                role,
            });
        }

        let subject = format!("Project Assignment Update: {}", project.name);
        let roster = team_listing(&team);
        Ok(unique_by_email(recipients)
            .into_iter()
            .map(|member| OutgoingMail {
                body: format!(
                    "Hello {},\n\nThere has been an update to the project \"{}\".\n\n{} has been assigned as {}.\n\nCurrent Project Team:\n{}\n\nRegards,\nThe InternHub Team",
                    member.name,
                    project.name,
                    newcomer.name,
                    role.label(),
                    roster
                ),
                to: member.email,
                subject: subject.clone(),
            })
            .collect())
    }

    async fn project_broadcast(
        &self,
        project_id: Uuid,
        subject: Option<String>,
        body: String,
        actor_id: Uuid,
    ) -> Result<Vec<OutgoingMail>, FanoutError> {
        let Some((project, assignment)) = self.authorized_context(project_id, actor_id).await?
        else {
            return Ok(Vec::new());
        };
        let subject = subject
            .filter(|subject| !subject.trim().is_empty())
            .unwrap_or_else(|| format!("A message regarding project: {}", project.name));
        let team = self.team(&assignment).await?;

        Ok(unique_by_email(team)
            .into_iter()
            .map(|member| OutgoingMail {
                body: format!(
                    "Hello {},\n\n{}\n\nRegards,\nThe InternHub Team",
                    member.name, body
                ),
                to: member.email,
                subject: subject.clone(),
            })
            .collect())
    }

    async fn global_broadcast(
        &self,
        subject: Option<String>,
        body: String,
    ) -> Result<Vec<OutgoingMail>, FanoutError> {
        let subject = subject
            .filter(|subject| !subject.trim().is_empty())
            .unwrap_or_else(|| GLOBAL_BROADCAST_SUBJECT.to_string());

        let mut everyone = Vec::new();
        for assignment in self.store.find(&AssignmentFilter::default()).await? {
            everyone.extend(self.team(&assignment).await?);
        }

        Ok(unique_by_email(everyone)
            .into_iter()
            .map(|member| OutgoingMail {
                body: format!(
                    "Hello {},\n\n{}\n\nRegards,\nThe InternHub Team",
                    member.name, body
                ),
                to: member.email,
                subject: subject.clone(),
            })
            .collect())
    }

    fn deliver(&self, mails: Vec<OutgoingMail>) -> Vec<JoinHandle<()>> {
        mails
            .into_iter()
            .map(|mail| {
                let mailer = Arc::clone(&self.mailer);
                let limit = self.delivery_timeout;
                tokio::spawn(async move {
                    let to = mail.to.clone();
                    match tokio::time::timeout(limit, mailer.send(mail)).await {
                        Ok(Ok(())) => debug!(%to, "notification delivered"),
                        Ok(Err(err)) => warn!(%to, error = %err, "notification delivery failed"),
                        Err(_) => warn!(%to, "notification delivery timed out"),
                    }
                })
            })
            .collect()
    }
}

fn unique_by_email(members: Vec<TeamMember>) -> Vec<TeamMember> {
    let mut seen = HashSet::new();
    members
        .into_iter()
        .filter(|member| seen.insert(member.email.to_ascii_lowercase()))
        .collect()
}

fn team_listing(team: &[TeamMember]) -> String {
    if team.is_empty() {
        return "You are the first member of this project team.".to_string();
    }
    team.iter()
        .map(|member| format!("{} ({}) - {}", member.name, member.email, member.role.label()))
        .collect::<Vec<_>>()
        .join("\n")
}
