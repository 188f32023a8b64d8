use reelkit_render::{AtlasError, GraphicsError, ShaderError};

#[derive(Debug, Clone, PartialEq)]
pub enum DisplayError {
    /// Called before `initialize` finished or after `destroy`.
    NotInitialized,
    AlreadyInitialized,
    ReelIndexOutOfRange { index: usize, reel_count: usize },
    InvalidConfig(String),
    Shader(ShaderError),
    Atlas(AtlasError),
    Graphics(GraphicsError),
}

impl std::fmt::Display for DisplayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisplayError::NotInitialized => write!(f, "Display is not initialized"),
            DisplayError::AlreadyInitialized => write!(f, "Display is already initialized"),
            DisplayError::ReelIndexOutOfRange { index, reel_count } => {
                write!(f, "Reel index {} out of range ({} reels)", index, reel_count)
            }
            DisplayError::InvalidConfig(msg) => write!(f, "Invalid display config: {}", msg),
            DisplayError::Shader(e) => write!(f, "Shader error: {}", e),
            DisplayError::Atlas(e) => write!(f, "Atlas error: {}", e),
            DisplayError::Graphics(e) => write!(f, "Graphics error: {}", e),
        }
    }
}

impl std::error::Error for DisplayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DisplayError::Shader(e) => Some(e),
            DisplayError::Atlas(e) => Some(e),
            DisplayError::Graphics(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ShaderError> for DisplayError {
    fn from(e: ShaderError) -> Self {
        DisplayError::Shader(e)
    }
}

impl From<AtlasError> for DisplayError {
    fn from(e: AtlasError) -> Self {
        DisplayError::Atlas(e)
    }
}

impl From<GraphicsError> for DisplayError {
    fn from(e: GraphicsError) -> Self {
        DisplayError::Graphics(e)
    }
}

pub type DisplayResult<T> = Result<T, DisplayError>;
