//! World settings, embedded as an NBT compound in the overworld's user data.

use pile_nbt::Tag;
use std::collections::BTreeMap;
use std::io::Cursor;

/// Global gameplay settings for a provider's worlds.
///
/// Game mode and difficulty are stored as the host's numeric identifiers;
/// the storage layer does not interpret them.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub name: String,
    pub spawn: (i32, i32, i32),
    pub time: i64,
    pub time_cycle: bool,
    pub rain_time: i64,
    pub raining: bool,
    pub thunder_time: i64,
    pub thundering: bool,
    pub weather_cycle: bool,
    pub current_tick: i64,
    pub default_game_mode: i32,
    pub difficulty: i32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            name: "Pile World".to_string(),
            spawn: (0, 64, 0),
            time: 6000,
            time_cycle: true,
            rain_time: 0,
            raining: false,
            thunder_time: 0,
            thundering: false,
            weather_cycle: true,
            current_tick: 0,
            default_game_mode: 0,
            difficulty: 2,
        }
    }
}

impl Settings {
    /// Encodes every field into a single unnamed NBT compound.
    pub fn to_user_data(&self) -> Vec<u8> {
        let mut entries = BTreeMap::new();
        entries.insert("name".to_string(), Tag::String(self.name.clone()));
        entries.insert("spawnX".to_string(), Tag::Int(self.spawn.0));
        entries.insert("spawnY".to_string(), Tag::Int(self.spawn.1));
        entries.insert("spawnZ".to_string(), Tag::Int(self.spawn.2));
        entries.insert("time".to_string(), Tag::Long(self.time));
        entries.insert("timeCycle".to_string(), Tag::Byte(self.time_cycle as i8));
        entries.insert("rainTime".to_string(), Tag::Long(self.rain_time));
        entries.insert("raining".to_string(), Tag::Byte(self.raining as i8));
        entries.insert("thunderTime".to_string(), Tag::Long(self.thunder_time));
        entries.insert("thundering".to_string(), Tag::Byte(self.thundering as i8));
        entries.insert(
            "weatherCycle".to_string(),
            Tag::Byte(self.weather_cycle as i8),
        );
        entries.insert("currentTick".to_string(), Tag::Long(self.current_tick));
        entries.insert(
            "defaultGameMode".to_string(),
            Tag::Int(self.default_game_mode),
        );
        entries.insert("difficulty".to_string(), Tag::Int(self.difficulty));

        let mut out = Vec::new();
        // The compound is the sole root tag; its name is irrelevant.
        if Tag::Compound(entries).write(&mut out, "").is_err() {
            out.clear();
        }
        out
    }

    /// Decodes settings from a user-data blob, starting from defaults and
    /// keeping them for any field the blob is missing. Returns `None` when
    /// the blob is empty or not an NBT compound at all.
    pub fn from_user_data(data: &[u8]) -> Option<Settings> {
        if data.is_empty() {
            return None;
        }
        let (_, root) = Tag::read(&mut Cursor::new(data)).ok()?;
        root.as_compound()?;

        let mut settings = Settings::default();
        if let Some(name) = root.get("name").and_then(Tag::as_str) {
            settings.name = name.to_string();
        }
        if let (Some(x), Some(y), Some(z)) = (
            root.get("spawnX").and_then(Tag::as_i32),
            root.get("spawnY").and_then(Tag::as_i32),
            root.get("spawnZ").and_then(Tag::as_i32),
        ) {
            settings.spawn = (x, y, z);
        }
        if let Some(time) = root.get("time").and_then(Tag::as_i64) {
            settings.time = time;
        }
        if let Some(v) = root.get("timeCycle").and_then(Tag::as_bool) {
            settings.time_cycle = v;
        }
        if let Some(v) = root.get("rainTime").and_then(Tag::as_i64) {
            settings.rain_time = v;
        }
        if let Some(v) = root.get("raining").and_then(Tag::as_bool) {
            settings.raining = v;
        }
        if let Some(v) = root.get("thunderTime").and_then(Tag::as_i64) {
            settings.thunder_time = v;
        }
        if let Some(v) = root.get("thundering").and_then(Tag::as_bool) {
            settings.thundering = v;
        }
        if let Some(v) = root.get("weatherCycle").and_then(Tag::as_bool) {
            settings.weather_cycle = v;
        }
        if let Some(v) = root.get("currentTick").and_then(Tag::as_i64) {
            settings.current_tick = v;
        }
        if let Some(v) = root.get("defaultGameMode").and_then(Tag::as_i32) {
            settings.default_game_mode = v;
        }
        if let Some(v) = root.get("difficulty").and_then(Tag::as_i32) {
            settings.difficulty = v;
        }
        Some(settings)
    }
}
