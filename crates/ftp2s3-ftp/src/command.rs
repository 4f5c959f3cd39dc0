//! Control-channel command parsing.

use std::fmt;

/// A parsed control-channel command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `USER <name>`
    User(String),
    /// `PASS <password>`
    Pass(String),
    /// `SYST`
    Syst,
    /// `FEAT`
    Feat,
    /// `OPTS <option>`
    Opts(String),
    /// `NOOP`
    Noop,
    /// `PWD` / `XPWD`
    Pwd,
    /// `CWD <path>` / `XCWD <path>`
    Cwd(String),
    /// `CDUP` / `XCUP`
    Cdup,
    /// `TYPE <code>`
    Type(String),
    /// `MODE <code>`
    Mode(String),
    /// `STRU <code>`
    Stru(String),
    /// `PASV`
    Pasv,
    /// `EPSV [ALL | protocol]`
    Epsv,
    /// `PORT` / `EPRT`, active mode.
    Active,
    /// `LIST [options] [path]`
    List(Option<String>),
    /// `NLST [options] [path]`
    Nlst(Option<String>),
    /// `RETR <path>`
    Retr(String),
    /// `STOR <path>`
    Stor(String),
    /// `DELE <path>`
    Dele(String),
    /// `RMD <path>` / `XRMD <path>`
    Rmd(String),
    /// `MKD <path>` / `XMKD <path>`
    Mkd(String),
    /// `RNFR <path>`
    Rnfr(String),
    /// `RNTO <path>`
    Rnto(String),
    /// `SIZE <path>`
    Size(String),
    /// `MDTM <path>`
    Mdtm(String),
    /// `REST <offset>`
    Rest(u64),
    /// `QUIT`
    Quit,
    /// A known verb sent without its required argument.
    MissingArgument(&'static str),
    /// An argument that could not be parsed.
    InvalidArgument(&'static str),
    /// Anything else.
    Unknown(String),
}

impl Command {
    /// Parse one control line (without the trailing CRLF).
    ///
    /// Verbs are case-insensitive. Arguments are taken verbatim after the
    /// first space, so paths may contain spaces.
    ///
    /// # Examples
    ///
    /// ```
    /// use ftp2s3_ftp::Command;
    ///
    /// assert_eq!(Command::parse("retr a b.txt"), Command::Retr("a b.txt".into()));
    /// assert_eq!(Command::parse("LIST -la"), Command::List(None));
    /// ```
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let line = line.trim_end_matches(['\r', '\n']);
        let (verb, arg) = match line.split_once(' ') {
            Some((verb, arg)) => (verb, arg),
            None => (line, ""),
        };
        let verb = verb.to_ascii_uppercase();

        match verb.as_str() {
            "USER" => required(arg, "USER").map_or_else(|c| c, Self::User),
            // An empty password is a valid (if wrong) password.
            "PASS" => Self::Pass(arg.to_owned()),
            "SYST" => Self::Syst,
            "FEAT" => Self::Feat,
            "OPTS" => required(arg, "OPTS").map_or_else(|c| c, Self::Opts),
            "NOOP" => Self::Noop,
            "PWD" | "XPWD" => Self::Pwd,
            "CWD" | "XCWD" => required(arg, "CWD").map_or_else(|c| c, Self::Cwd),
            "CDUP" | "XCUP" => Self::Cdup,
            "TYPE" => required(arg, "TYPE").map_or_else(|c| c, Self::Type),
            "MODE" => required(arg, "MODE").map_or_else(|c| c, Self::Mode),
            "STRU" => required(arg, "STRU").map_or_else(|c| c, Self::Stru),
            "PASV" => Self::Pasv,
            "EPSV" => Self::Epsv,
            "PORT" | "EPRT" => Self::Active,
            "LIST" => Self::List(listing_path(arg)),
            "NLST" => Self::Nlst(listing_path(arg)),
            "RETR" => required(arg, "RETR").map_or_else(|c| c, Self::Retr),
            "STOR" => required(arg, "STOR").map_or_else(|c| c, Self::Stor),
            "DELE" => required(arg, "DELE").map_or_else(|c| c, Self::Dele),
            "RMD" | "XRMD" => required(arg, "RMD").map_or_else(|c| c, Self::Rmd),
            "MKD" | "XMKD" => required(arg, "MKD").map_or_else(|c| c, Self::Mkd),
            "RNFR" => required(arg, "RNFR").map_or_else(|c| c, Self::Rnfr),
            "RNTO" => required(arg, "RNTO").map_or_else(|c| c, Self::Rnto),
            "SIZE" => required(arg, "SIZE").map_or_else(|c| c, Self::Size),
            "MDTM" => required(arg, "MDTM").map_or_else(|c| c, Self::Mdtm),
            "REST" => match required(arg, "REST") {
                Ok(offset) => offset
                    .trim()
                    .parse()
                    .map_or(Self::InvalidArgument("REST"), Self::Rest),
                Err(missing) => missing,
            },
            "QUIT" => Self::Quit,
            _ => Self::Unknown(verb),
        }
    }

    /// Whether the command may be issued before login.
    #[must_use]
    pub fn allowed_before_login(&self) -> bool {
        matches!(
            self,
            Self::User(_)
                | Self::Pass(_)
                | Self::Quit
                | Self::Syst
                | Self::Feat
                | Self::Noop
                | Self::MissingArgument(_)
                | Self::InvalidArgument(_)
                | Self::Unknown(_)
        )
    }
}

impl fmt::Display for Command {
    /// Log-safe rendering: the password is never printed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass(_) => f.write_str("PASS ***"),
            other => write!(f, "{other:?}"),
        }
    }
}

fn required(arg: &str, verb: &'static str) -> Result<String, Command> {
    if arg.trim().is_empty() {
        Err(Command::MissingArgument(verb))
    } else {
        Ok(arg.to_owned())
    }
}

/// Strip `ls`-style option words (`-la`, `-a`) that many clients prepend.
fn listing_path(arg: &str) -> Option<String> {
    let mut rest = arg.trim();
    while let Some(option) = rest.strip_prefix('-') {
        rest = option
            .split_once(' ')
            .map_or("", |(_, tail)| tail.trim_start());
    }
    (!rest.is_empty()).then(|| rest.to_owned())
}
