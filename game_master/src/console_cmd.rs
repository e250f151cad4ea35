use anyhow::bail;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCmd {
    Start,
    Pause,
    Resume,
    Status,
    Quit,
}

impl ConsoleCmd {
    pub fn parse(input: &str) -> anyhow::Result<ConsoleCmd> {
        let message_type = match input.find(' ') {
            Some(i) => &input[..i],
            None => input,
        };

        match message_type {
            "start" => Ok(ConsoleCmd::Start),
            "pause" => Ok(ConsoleCmd::Pause),
            "resume" => Ok(ConsoleCmd::Resume),
            "status" => Ok(ConsoleCmd::Status),
            "quit" | "exit" => Ok(ConsoleCmd::Quit),
            _ => bail!("cmd not recognized: {input}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_commands() {
        assert_eq!(ConsoleCmd::parse("start").unwrap(), ConsoleCmd::Start);
        assert_eq!(ConsoleCmd::parse("status now").unwrap(), ConsoleCmd::Status);
        assert!(ConsoleCmd::parse("reset").is_err());
    }
}
