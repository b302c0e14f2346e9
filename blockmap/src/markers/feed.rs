//! Parsing of the players and markers feeds published by the map server.

use serde::Deserialize;

use super::{PlayerMarker, TownMarker};

#[derive(Debug, thiserror::Error)]
pub enum MarkerError {
    #[error("network failure: {0}")]
    Network(#[from] reqwest::Error),

    #[error("server responded with {0}")]
    Protocol(reqwest::StatusCode),

    #[error("malformed feed: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Label preceding the list of residents in a town's tooltip.
const RESIDENTS_LABEL: &str = "Жители:";

#[derive(Deserialize)]
struct PlayersFeed {
    #[serde(default)]
    players: Vec<PlayerEntry>,
}

#[derive(Deserialize)]
struct PlayerEntry {
    name: String,
    #[serde(default)]
    uuid: String,
    x: f64,
    y: f64,
    z: f64,
    #[serde(default)]
    yaw: f32,
}

#[derive(Deserialize)]
struct MarkerGroup {
    markers: Option<Vec<MarkerEntry>>,
}

fn icon_type() -> String {
    "icon".to_owned()
}

#[derive(Deserialize)]
struct MarkerEntry {
    #[serde(rename = "type", default = "icon_type")]
    kind: String,
    point: Option<Point>,
    #[serde(default)]
    tooltip: String,
    icon: Option<String>,
}

#[derive(Deserialize)]
struct Point {
    x: f64,
    z: f64,
}

pub fn parse_players(json: &str) -> Result<Vec<PlayerMarker>, MarkerError> {
    let feed: PlayersFeed = serde_json::from_str(json)?;
    Ok(feed
        .players
        .into_iter()
        .map(|player| PlayerMarker {
            name: player.name,
            uuid: player.uuid,
            x: player.x,
            y: player.y,
            z: player.z,
            yaw: player.yaw,
        })
        .collect())
}

/// Towns are the `icon` markers of all groups, named after their tooltips.
pub fn parse_towns(json: &str) -> Result<Vec<TownMarker>, MarkerError> {
    let groups: Vec<MarkerGroup> = serde_json::from_str(json)?;
    Ok(groups
        .into_iter()
        .filter_map(|group| group.markers)
        .flatten()
        .filter(|marker| marker.kind == "icon")
        .filter_map(|marker| {
            let point = marker.point?;
            let name = town_name(&marker.tooltip);
            (!name.is_empty()).then(|| TownMarker {
                name,
                icon: marker.icon.unwrap_or_else(|| "town_icon".to_owned()),
                x: point.x,
                z: point.z,
                residents: resident_count(&marker.tooltip),
            })
        })
        .collect())
}

fn strip_tags(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag => text.push(c),
            _ => {}
        }
    }
    text
}

/// Bold text if there is any, otherwise the first line with markup removed.
pub fn town_name(tooltip: &str) -> String {
    if let Some(start) = tooltip.find("<b>").map(|i| i + "<b>".len()) {
        if let Some(length) = tooltip[start..].find("</b>").filter(|length| *length > 0) {
            return tooltip[start..start + length].trim().to_owned();
        }
    }

    let first_line = tooltip.split("<br>").next().unwrap_or_default();
    strip_tags(first_line).trim().to_owned()
}

/// Number of names listed after the residents label, up to the end of the line.
pub fn resident_count(tooltip: &str) -> usize {
    let Some(start) = tooltip.find(RESIDENTS_LABEL) else {
        return 0;
    };

    let rest = &tooltip[start + RESIDENTS_LABEL.len()..];
    let line = rest.split("<br>").next().unwrap_or_default();
    strip_tags(line)
        .split(',')
        .filter(|name| !name.trim().is_empty())
        .count()
}
