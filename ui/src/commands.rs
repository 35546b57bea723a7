use std::path::PathBuf;

use anyhow::Result;
use structopt::clap::AppSettings;
use structopt::StructOpt;

use api::TravelMode;

/// One line of input. Each user intent is one command.
#[derive(StructOpt, Debug, PartialEq)]
#[structopt(
    name = "tourmap",
    global_settings = &[AppSettings::DisableVersion, AppSettings::VersionlessSubcommands]
)]
pub enum Command {
    /// Reload the places in view
    Places,
    /// Move the map to a bounding box and reload the places in it
    #[structopt(setting = AppSettings::AllowNegativeNumbers)]
    View {
        west: f64,
        south: f64,
        east: f64,
        north: f64,
    },
    /// List categories and which are shown
    Categories,
    /// Show or hide one category
    Toggle { category: String },
    /// Search places by name
    Search { text: Vec<String> },
    /// Show everything about one place
    Detail { id: i64 },
    /// Set your location
    #[structopt(setting = AppSettings::AllowNegativeNumbers)]
    Locate {
        lon: f64,
        lat: f64,
        /// Radius of the fix in meters
        #[structopt(long)]
        accuracy: Option<f64>,
    },
    /// Add a place to your list
    Add { id: i64 },
    /// Remove a place from your list
    Remove { id: i64 },
    /// Move a place in your list to a new position, counting from 1
    Move { id: i64, position: usize },
    /// Show your list
    Bucket,
    /// Route from your location to one place
    Route { id: i64 },
    /// Route through your whole list
    Trip,
    /// Switch between car, foot and bus, recomputing the shown route
    Mode { mode: TravelMode },
    /// Zoom to one leg of the shown route, counting from 1
    Leg { n: usize },
    /// Remove the shown route
    Clear,
    /// Change the base map
    Base { layer: Vec<String> },
    /// Write the map layers to a GeoJSON file
    Export {
        #[structopt(parse(from_os_str))]
        path: PathBuf,
    },
    /// Log in as admin
    Login { secret: String },
    /// Log out of admin
    Logout,
    /// Manage places (needs admin login)
    Admin(AdminCommand),
    /// Save the view and exit
    #[structopt(alias = "exit")]
    Quit,
}

#[derive(StructOpt, Debug, PartialEq)]
pub enum AdminCommand {
    /// List places, never bus stops
    List {
        /// Only places whose name matches
        #[structopt(long)]
        q: Option<String>,
        /// Only one type
        #[structopt(long = "type")]
        place_type: Option<String>,
    },
    /// Show one place as stored
    Show { id: i64 },
    /// Create a place
    Create {
        #[structopt(flatten)]
        fields: PlaceFields,
    },
    /// Change a place; fields left out keep their value
    Edit {
        id: i64,
        #[structopt(flatten)]
        fields: PlaceFields,
    },
    /// Delete a place
    Delete {
        id: i64,
        /// Confirm the deletion
        #[structopt(long)]
        yes: bool,
    },
    /// Add photos to a place's gallery
    Upload {
        id: i64,
        #[structopt(parse(from_os_str), required = true)]
        images: Vec<PathBuf>,
    },
}

#[derive(StructOpt, Debug, Default, PartialEq)]
pub struct PlaceFields {
    #[structopt(long)]
    pub name: Option<String>,
    #[structopt(long = "type")]
    pub place_type: Option<String>,
    #[structopt(long)]
    pub description: Option<String>,
    #[structopt(long, allow_hyphen_values = true)]
    pub lon: Option<f64>,
    #[structopt(long, allow_hyphen_values = true)]
    pub lat: Option<f64>,
    /// The main photo
    #[structopt(long, parse(from_os_str))]
    pub image: Option<PathBuf>,
    /// Extra photos, uploaded to the gallery after saving
    #[structopt(long, parse(from_os_str))]
    pub gallery: Vec<PathBuf>,
    #[structopt(long)]
    pub facebook: Option<String>,
    #[structopt(long)]
    pub instagram: Option<String>,
    #[structopt(long)]
    pub website: Option<String>,
    #[structopt(long)]
    pub phone: Option<String>,
}

/// What to do with one input line.
#[derive(Debug, PartialEq)]
pub enum Parsed {
    Blank,
    Command(Command),
    /// Help text or a usage error, to show as is
    Message(String),
}

/// Splits a line into words, keeping "quoted phrases" together.
pub fn split_words(line: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quoted = false;
    for c in line.chars() {
        if c == '"' {
            quoted = !quoted;
            in_word = true;
        } else if quoted {
            current.push(c);
        } else if c.is_whitespace() {
            if in_word {
                words.push(std::mem::take(&mut current));
                in_word = false;
            }
        } else {
            current.push(c);
            in_word = true;
        }
    }
    if quoted {
        bail!("Unclosed quote");
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

pub fn parse_line(line: &str) -> Parsed {
    let words = match split_words(line) {
        Ok(words) => words,
        Err(err) => return Parsed::Message(err.to_string()),
    };
    if words.is_empty() {
        return Parsed::Blank;
    }
    // clap expects the program name first
    let args = std::iter::once("tourmap".to_string()).chain(words);
    match Command::from_iter_safe(args) {
        Ok(cmd) => Parsed::Command(cmd),
        Err(err) => Parsed::Message(err.message),
    }
}
