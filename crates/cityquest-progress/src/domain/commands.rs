//! Commands for the Quest Progress context.

use cityquest_core::command::Command;
use cityquest_core::platform::Platform;
use uuid::Uuid;

/// Command to start a quest, or resume it if paused.
#[derive(Debug, Clone)]
pub struct StartQuest {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The acting user.
    pub user_id: Uuid,
    /// The quest to start.
    pub quest_id: Uuid,
    /// Client platform the request came from.
    pub platform: Platform,
}

/// Command to pause an active quest.
#[derive(Debug, Clone)]
pub struct PauseQuest {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The acting user.
    pub user_id: Uuid,
    /// The quest to pause.
    pub quest_id: Uuid,
    /// Client platform the request came from.
    pub platform: Platform,
}

/// Command to complete an active quest.
#[derive(Debug, Clone)]
pub struct CompleteQuest {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The acting user.
    pub user_id: Uuid,
    /// The quest to complete.
    pub quest_id: Uuid,
    /// Client platform the request came from.
    pub platform: Platform,
}

/// Command to abandon an active or paused quest.
#[derive(Debug, Clone)]
pub struct AbandonQuest {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The acting user.
    pub user_id: Uuid,
    /// The quest to abandon.
    pub quest_id: Uuid,
    /// Client platform the request came from.
    pub platform: Platform,
}

/// Command to record a geofenced step verification.
#[derive(Debug, Clone)]
pub struct RecordStepCheck {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The acting user.
    pub user_id: Uuid,
    /// The quest the step belongs to.
    pub quest_id: Uuid,
    /// Latitude reported by the client.
    pub client_latitude: f64,
    /// Longitude reported by the client.
    pub client_longitude: f64,
    /// Distance to the step's point, in metres.
    pub distance_to_point: f64,
    /// Whether the check passed.
    pub check_passed: bool,
    /// Client platform the request came from.
    pub platform: Platform,
}

/// Command to flip the user's like on a quest.
#[derive(Debug, Clone)]
pub struct ToggleLike {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The acting user.
    pub user_id: Uuid,
    /// The quest to like or unlike.
    pub quest_id: Uuid,
    /// Client platform the request came from.
    pub platform: Platform,
}

macro_rules! impl_command {
    ($($ty:ident => $name:literal),* $(,)?) => {
        $(
            impl Command for $ty {
                fn command_type(&self) -> &'static str {
                    $name
                }

                fn correlation_id(&self) -> Uuid {
                    self.correlation_id
                }

                fn platform(&self) -> &Platform {
                    &self.platform
                }
            }
        )*
    };
}

impl_command! {
    StartQuest => "progress.start_quest",
    PauseQuest => "progress.pause_quest",
    CompleteQuest => "progress.complete_quest",
    AbandonQuest => "progress.abandon_quest",
    RecordStepCheck => "progress.record_step_check",
    ToggleLike => "progress.toggle_like",
}
