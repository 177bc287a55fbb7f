use argp::FromArgs;

/// The database consulted when `-m` is not given.
pub const DEFAULT_DATABASE: &str = "/etc/magic";

/// Top-level command
#[derive(FromArgs, PartialEq, Eq, Debug)]
#[argp(description = "Determine the type of each FILE from its metadata and contents.")]
pub struct Scry {
    #[argp(option, short = 'v', default = "0")]
    #[argp(description = "Logging level (0 = Off, 1 = Error, 2 = Warn, 3 = Info, 4 = Debug, 5 = Trace)")]
    pub verbose: usize,

    #[argp(option, short = 'm')]
    #[argp(description = "Magic database to consult instead of /etc/magic")]
    pub magic: Option<String>,

    #[argp(switch, short = 's')]
    #[argp(description = "Read block and character special files as if they were regular")]
    pub special: bool,

    #[argp(switch, short = 'L')]
    #[argp(description = "Follow symbolic links instead of reporting them")]
    pub dereference: bool,

    #[argp(switch)]
    #[argp(description = "Print mime types instead of descriptions")]
    pub mime: bool,

    #[argp(positional)]
    #[argp(description = "Files to identify")]
    pub files: Vec<String>,
}
