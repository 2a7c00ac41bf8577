use crate::core::message::Message;

/// Which input surface the shell shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Chat,
    ImageGenerator,
}

/// A state change requested by a command. The shell applies these in order
/// and must handle every variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    None,
    Exit,
    ClearTranscript,
    ClearTokenCounter,
    ClearError,
    SetError(String),
    ReplaceTranscript(Vec<Message>),
    AppendMessage(Message),
    ToggleHelp,
    SetMode {
        mode: ViewMode,
        prompt: Option<String>,
    },
    CreateNewChat,
    SetChatId(String),
    SetChatTitle(String),
    SetModel(String),
    ShowInfo(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandResult {
    pub success: bool,
    pub actions: Vec<Effect>,
    pub error: Option<String>,
}

impl CommandResult {
    pub fn success(actions: Vec<Effect>) -> Self {
        Self {
            success: true,
            actions,
            error: None,
        }
    }

    pub fn action(effect: Effect) -> Self {
        Self::success(vec![effect])
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::action(Effect::ShowInfo(message.into()))
    }

    /// A failed result that also asks the shell to display the message.
    pub fn failure(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            success: false,
            actions: vec![Effect::SetError(message.clone())],
            error: Some(message),
        }
    }
}
