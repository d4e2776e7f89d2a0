use std::sync::OnceLock;

use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedSender;

/// User actions, as the pointer and picker controls of a map UI would emit them.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Stop,
    Refresh,
    SwitchStation(String),
    SwitchLayer(String),
    ListStations,
    ListLayers,
    HoverMove { lat: f64, lon: f64 },
    HoverLeave,
    SetHoverEnabled(bool),
    SetAdaptive(bool),
    Status,
    Help,
    Quit,
}

pub const HELP: &str = "\
Commands:
  start | stop            toggle auto-refresh
  refresh                 refresh now
  station <ID>            switch radar station
  layer <ID>              switch weather layer
  stations | layers       list choices
  hover <lat> <lon>       look up the value at a point
  leave                   hide the hover value
  hover-enable on|off     enable or disable hover lookups
  adaptive on|off         enable or disable adaptive refresh
  status                  show refresh state
  quit";

fn station_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z0-9]{3,5}$").expect("valid station pattern"))
}

fn parse_switch(arg: Option<&str>) -> Result<bool, String> {
    match arg {
        Some("on") | Some("true") => Ok(true),
        Some("off") | Some("false") => Ok(false),
        _ => Err("expected on or off".to_string()),
    }
}

fn parse_coordinate(raw: Option<&str>, name: &str, limit: f64) -> Result<f64, String> {
    let value: f64 = raw
        .ok_or_else(|| format!("missing {}", name))?
        .parse()
        .map_err(|_| format!("invalid {}", name))?;
    if !value.is_finite() || value.abs() > limit {
        return Err(format!("{} out of range", name));
    }
    Ok(value)
}

pub fn parse_command(line: &str) -> Result<Command, String> {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        return Err("empty command".to_string());
    };

    let command = match verb.to_lowercase().as_str() {
        "start" => Command::Start,
        "stop" => Command::Stop,
        "refresh" => Command::Refresh,
        "station" => {
            let id = parts.next().ok_or("missing station id")?.to_uppercase();
            if !station_id_pattern().is_match(&id) {
                return Err(format!("invalid station id: {}", id));
            }
            Command::SwitchStation(id)
        }
        "layer" => Command::SwitchLayer(parts.next().ok_or("missing layer id")?.to_string()),
        "stations" => Command::ListStations,
        "layers" => Command::ListLayers,
        "hover" => {
            let lat = parse_coordinate(parts.next(), "latitude", 90.0)?;
            let lon = parse_coordinate(parts.next(), "longitude", 180.0)?;
            Command::HoverMove { lat, lon }
        }
        "leave" => Command::HoverLeave,
        "hover-enable" => Command::SetHoverEnabled(parse_switch(parts.next())?),
        "adaptive" => Command::SetAdaptive(parse_switch(parts.next())?),
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("unknown command: {}", other)),
    };
    Ok(command)
}

/// Reads commands from stdin until EOF, which is treated as `quit`.
pub fn spawn_stdin_reader(commands: UnboundedSender<Command>) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => match parse_command(&line) {
                    Ok(command) => {
                        if commands.send(command).is_err() {
                            break;
                        }
                    }
                    Err(e) => eprintln!("{} (type 'help')", e),
                },
                Ok(None) => {
                    let _ = commands.send(Command::Quit);
                    break;
                }
                Err(e) => {
                    log::error!("Failed to read stdin: {}", e);
                    let _ = commands.send(Command::Quit);
                    break;
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_switch_commands() {
        assert_eq!(
            parse_command("station kcle"),
            Ok(Command::SwitchStation("KCLE".to_string()))
        );
        assert_eq!(
            parse_command("layer echo_tops"),
            Ok(Command::SwitchLayer("echo_tops".to_string()))
        );
        assert!(parse_command("station k-1").is_err());
        assert!(parse_command("station").is_err());
    }

    #[test]
    fn parses_hover_coordinates() {
        assert_eq!(
            parse_command("hover 41.5 -81.7"),
            Ok(Command::HoverMove { lat: 41.5, lon: -81.7 })
        );
        assert!(parse_command("hover 95 0").is_err());
        assert!(parse_command("hover 41.5").is_err());
        assert!(parse_command("hover abc 1").is_err());
    }

    #[test]
    fn parses_toggles_and_simple_verbs() {
        assert_eq!(parse_command("adaptive off"), Ok(Command::SetAdaptive(false)));
        assert_eq!(parse_command("hover-enable on"), Ok(Command::SetHoverEnabled(true)));
        assert!(parse_command("adaptive maybe").is_err());
        assert_eq!(parse_command("  STOP "), Ok(Command::Stop));
        assert_eq!(parse_command("exit"), Ok(Command::Quit));
        assert!(parse_command("").is_err());
        assert!(parse_command("dance").is_err());
    }
}
