use crate::error::CallError;
use meshcall_core::{ParticipantId, RoomId};
use tokio::sync::oneshot;

pub type Reply<T> = oneshot::Sender<Result<T, CallError>>;

/// Команды, поступающие в сессию звонка от UI через `CallHandle`.
#[derive(Debug)]
pub enum CallCommand {
    /// Запрос камеры/микрофона и вход в комнату.
    Start {
        room_id: RoomId,
        room_token: String,
        reply: Reply<()>,
    },

    /// Возвращает новое значение флага `enabled` для аудио.
    ToggleMute { reply: Reply<bool> },

    ToggleVideo { reply: Reply<bool> },

    /// Возвращает `true`, если демонстрация экрана включена.
    ToggleScreenShare { reply: Reply<bool> },

    /// Повторная попытка после отказа в доступе (ровно один запрос за вызов).
    RetryMedia { reply: Reply<()> },

    /// Завершение звонка; повторный вызов безопасен.
    End { reply: Reply<()> },

    SetParticipantProfile {
        id: ParticipantId,
        display_name: String,
        avatar_ref: Option<String>,
        reply: Reply<bool>,
    },
}
