use serde::{Deserialize, Deserializer};

/// Where to connect, and who to be once connected.
#[derive(Clone, Debug, Deserialize)]
pub struct ServerConfig
{
    pub host: String,
    pub port: u16,
    pub nick: String,
    pub username: String,
    pub realname: String,
    /// Channels to join after every successful connection. Written in the
    /// config file as a single whitespace-separated string.
    #[serde(default, deserialize_with = "whitespace_list")]
    pub channels: Vec<String>,
}

impl ServerConfig
{
    /// A short name for this server, used to label logs and timers
    pub fn label(&self) -> String
    {
        format!("{}:{}", self.host, self.port)
    }
}

fn whitespace_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw.split_whitespace().map(str::to_string).collect())
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn channels_split_on_whitespace()
    {
        let conf: ServerConfig = serde_json::from_str(
            r##"{
                "host": "irc.example.net",
                "port": 6667,
                "nick": "bot",
                "username": "bot",
                "realname": "A bot",
                "channels": "  #one #two\t#three  "
            }"##,
        )
        .unwrap();

        assert_eq!(conf.channels, vec!["#one", "#two", "#three"]);
        assert_eq!(conf.label(), "irc.example.net:6667");
    }

    #[test]
    fn channels_are_optional()
    {
        let conf: ServerConfig = serde_json::from_str(
            r#"{"host": "h", "port": 1, "nick": "n", "username": "u", "realname": "r"}"#,
        )
        .unwrap();

        assert!(conf.channels.is_empty());
    }
}
