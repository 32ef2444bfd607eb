//! Slash command parsing and the static texts that go with them.

use {fsbot_structure::ArchiveFormat, teloxide::types::BotCommand};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    CreateZip(ArchiveFormat),
    QuickCreate(ArchiveFormat),
    CreatePdf,
    Template {
        name: Option<String>,
        format: ArchiveFormat,
    },
    Api(ApiCommand),
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCommand {
    Test,
    /// Raw JSON following `create_structure`, whitespace preserved.
    CreateStructure(String),
    Usage,
}

/// Parse a message that starts with `/`.
///
/// Returns `None` for plain text and for commands addressed to a different
/// bot (`/cmd@otherbot`).
#[must_use]
pub fn parse_command(text: &str, bot_username: Option<&str>) -> Option<Command> {
    let text = text.trim_start();
    let body = text.strip_prefix('/')?;

    let (head, rest) = match body.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (body, ""),
    };
    let name = match head.split_once('@') {
        Some((name, target)) => {
            let ours = bot_username.is_some_and(|u| u.eq_ignore_ascii_case(target));
            if !ours {
                return None;
            }
            name
        },
        None => head,
    };
    if name.is_empty() {
        return None;
    }

    let mut args = rest.split_whitespace();
    let command = match name.to_ascii_lowercase().as_str() {
        "start" => Command::Start,
        "help" => Command::Help,
        "createzip" => Command::CreateZip(ArchiveFormat::from_arg(args.next())),
        "quickcreate" => Command::QuickCreate(ArchiveFormat::from_arg(args.next())),
        "createpdf" => Command::CreatePdf,
        "template" => Command::Template {
            name: args.next().map(str::to_ascii_lowercase),
            format: ArchiveFormat::from_arg(args.next()),
        },
        "api" => Command::Api(parse_api(rest)),
        other => Command::Unknown(other.to_string()),
    };
    Some(command)
}

fn parse_api(rest: &str) -> ApiCommand {
    let (sub, payload) = match rest.split_once(char::is_whitespace) {
        Some((sub, payload)) => (sub, payload.trim()),
        None => (rest, ""),
    };
    match sub {
        "test" => ApiCommand::Test,
        "create_structure" if !payload.is_empty() => {
            ApiCommand::CreateStructure(payload.to_string())
        },
        _ => ApiCommand::Usage,
    }
}

pub const START_TEXT: &str = "Welcome to the File Structure Bot!\n\
I can create zipped file structures, convert text to PDF, and more.\n\
Commands:\n\
/createzip [zip|tar.gz] - Upload a text/JSON file for a structure\n\
/quickcreate [zip|tar.gz] - Send a structure directly\n\
/createpdf - Convert text to PDF\n\
/template [web|python] - Use a predefined structure\n\
/api - Simulate API interactions\n\
/help - Show this message";

pub const HELP_TEXT: &str = "Available commands:\n\
/createzip [zip|tar.gz] - Upload a text or JSON file with structure\n\
/quickcreate [zip|tar.gz] - Send structure in a message\n\
/createpdf - Send text or a file to create a PDF\n\
/template [web|python] [zip|tar.gz] - Create a predefined structure\n\
/api - Simulate API interactions\n\
/help - Show this message\n\n\
Example structure file:\n\
folder1/\n\
folder1/file1.txt\n\
Or JSON:\n\
[{\"path\": \"file1.txt\", \"content\": \"Hello\"}]";

pub const API_USAGE_TEXT: &str = "API Usage:\n\
/api test - Test the API\n\
/api create_structure [json_data] - Create a structure from JSON\n\
Example: /api create_structure [{\"path\": \"file.txt\", \"content\": \"Hello\"}]";

pub fn createzip_text(format: ArchiveFormat) -> String {
    format!(
        "Please send a text or JSON file with the file structure.\n\
         Format: {format}\n\
         Text example: folder1/\nfolder1/file.txt\n\
         JSON example: [{{\"path\": \"file.txt\", \"content\": \"Hello\"}}]"
    )
}

pub fn quickcreate_text(format: ArchiveFormat) -> String {
    format!(
        "Please send the file structure, one path per line.\n\
         Format: {format}\n\
         Example:\n\
         folder1/\n\
         folder1/file1.txt"
    )
}

pub const CREATEPDF_TEXT: &str = "Please send the text content for the PDF or upload a text file.\n\
Example: Hello, this is my PDF content!";

/// Commands registered with `setMyCommands` for client autocomplete.
pub fn bot_commands() -> Vec<BotCommand> {
    vec![
        BotCommand::new("start", "Show the welcome message"),
        BotCommand::new("createzip", "Upload a text/JSON file for a structure"),
        BotCommand::new("quickcreate", "Send a structure directly"),
        BotCommand::new("createpdf", "Convert text to PDF"),
        BotCommand::new("template", "Use a predefined structure (web, python)"),
        BotCommand::new("api", "Simulate API interactions"),
        BotCommand::new("help", "Show available commands"),
    ]
}
