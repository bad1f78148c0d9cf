//! Terminal implementations of the capability ports.
//!
//! | Adapter | Port |
//! |---|---|
//! | [`ConsoleSynthesizer`] | `SpeechSynthesizer`, word timing on tokio timers |
//! | [`LineRecognizer`] | `SpeechRecognizer`, fed one line per final transcript |
//! | [`EchoResponder`] | `TextResponder`, repeats the user back |

mod console;
mod echo;
mod lines;

pub use console::{ConsoleSynthesizer, DEFAULT_WORD_DURATION};
pub use echo::EchoResponder;
pub use lines::LineRecognizer;
