#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

mod admin;
mod commands;
mod components;
mod map;
mod savestate;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Local;
use structopt::StructOpt;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use api::{Client, GPSBounds, LonLat, Place, PlaceID, TravelMode, Unauthorized};
use model::{AppState, Debouncer, MapView, Ticket, UserLocation, SEARCH_DEBOUNCE};

use self::commands::{parse_line, Command, Parsed};
use self::components::{describe, summary};
use self::map::{default_viewport, BaseLayer, LayerMap};
use self::savestate::Savestate;

#[derive(StructOpt, Debug)]
#[structopt(name = "tourmap", about = "Find places, build a bucket list, and route through it")]
struct Args {
    /// Base URL of the places and routing backend. TOURMAP_API overrides it.
    #[structopt(long, default_value = "http://localhost:5000")]
    api: String,
    /// Where the bucket list and the saved view live. TOURMAP_DATA_DIR overrides it.
    #[structopt(long, default_value = "data", parse(from_os_str))]
    data_dir: PathBuf,
    /// How many legs of a trip to route at once
    #[structopt(long, default_value = "1")]
    leg_concurrency: usize,
    /// Start located here, given as lon,lat
    #[structopt(long, parse(try_from_str = LonLat::parse))]
    location: Option<LonLat>,
    /// After every command, write the map layers as GeoJSON to this file
    #[structopt(long, parse(from_os_str))]
    export: Option<PathBuf>,
}

impl Args {
    fn apply_env<F: Fn(&str) -> Option<String>>(&mut self, var: F) {
        if let Some(api) = var("TOURMAP_API").filter(|x| !x.is_empty()) {
            self.api = api;
        }
        if let Some(dir) = var("TOURMAP_DATA_DIR").filter(|x| !x.is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
        if self.leg_concurrency == 0 {
            warn!("--leg-concurrency 0 makes no sense; routing one leg at a time");
            self.leg_concurrency = 1;
        }
    }
}

enum Flow {
    Continue,
    Quit,
}

/// Places found by a debounced search, tagged with the ticket it was issued under.
struct SearchResults {
    ticket: Ticket,
    text: String,
    places: Vec<Place>,
}

pub struct App {
    state: AppState,
    map: LayerMap,
    client: Arc<Client>,
    data_dir: PathBuf,
    export: Option<PathBuf>,
    /// From the savestate, applied once categories load
    saved_selection: Option<Vec<String>>,
    debouncer: Debouncer,
    search_tx: mpsc::UnboundedSender<SearchResults>,
    pending_search: Option<Ticket>,
}

impl App {
    fn new(args: Args, search_tx: mpsc::UnboundedSender<SearchResults>) -> Result<Self> {
        let client = Arc::new(Client::new(&args.api)?);
        let savestate = Savestate::load(&args.data_dir);
        let (base, mode, viewport, saved_selection) = match savestate {
            Some(ss) => (ss.base, ss.mode, ss.viewport, ss.selected_categories),
            None => (BaseLayer::default(), TravelMode::Car, default_viewport(), None),
        };

        let mut state = AppState::load(&args.data_dir, mode, args.leg_concurrency);
        let mut map = LayerMap::new(base, viewport);
        if let Some(pos) = args.location {
            let location = UserLocation::new(pos, None);
            map.show_user_location(&location);
            state.set_user_location(location);
        }

        Ok(Self {
            state,
            map,
            client,
            data_dir: args.data_dir,
            export: args.export,
            saved_selection,
            debouncer: Debouncer::new(SEARCH_DEBOUNCE),
            search_tx,
            pending_search: None,
        })
    }

    /// Categories, then the places in view. The backend being down isn't fatal.
    async fn start(&mut self) {
        self.load_categories().await;
        self.reload_places().await;
        println!("{}", self.map.describe());
        println!("Type help for the list of commands");
    }

    async fn load_categories(&mut self) {
        match self.state.catalog.load_categories(&*self.client).await {
            Ok(_) => {
                if let Some(names) = self.saved_selection.take() {
                    self.state.catalog.restore_selection(&names);
                }
            }
            Err(err) => warn!("Couldn't load categories: {err:#}"),
        }
    }

    async fn reload_places(&mut self) {
        self.debouncer.cancel();
        self.pending_search = None;
        let bounds = self.map.viewport().clone();
        let places = self
            .state
            .catalog
            .load_viewport(&bounds, &*self.client)
            .await;
        self.map.replace_places(places);
        println!("{} places in view", places.len());
        println!("{}", describe::place_list(places));
    }

    async fn handle(&mut self, cmd: Command) -> Result<Flow> {
        match cmd {
            Command::Places => self.reload_places().await,
            Command::View {
                west,
                south,
                east,
                north,
            } => {
                self.map
                    .set_viewport(GPSBounds::from_corners(west, south, east, north)?);
                self.reload_places().await;
            }
            Command::Categories => {
                if self.state.catalog.categories().is_empty() {
                    self.load_categories().await;
                }
                println!("{}", describe::categories(&self.state.catalog));
            }
            Command::Toggle { category } => {
                let shown = self.state.catalog.toggle(&category)?;
                println!("{} {category}", if shown { "Showing" } else { "Hiding" });
                self.reload_places().await;
            }
            Command::Search { text } => self.search(text.join(" ")).await,
            Command::Detail { id } => {
                let id = PlaceID(id);
                let place = match self.state.catalog.lookup(id) {
                    Some(place) => place.clone(),
                    None => self.client.fetch_place(id).await?,
                };
                println!("{}", describe::place(&place, self.state.bucket.contains(id)));
            }
            Command::Locate { lon, lat, accuracy } => {
                let pos = match LonLat::from_coords(&[lon, lat]) {
                    Some(pos) if (-90.0..=90.0).contains(&lat) => pos,
                    _ => bail!("{lon}, {lat} isn't a position on Earth"),
                };
                let location = UserLocation::new(pos, accuracy);
                self.map.show_user_location(&location);
                self.state.set_user_location(location);
                println!("You are at {pos}");
            }
            Command::Add { id } => {
                let item = self.state.catalog.bucket_item_for(PlaceID(id))?;
                let name = item.name.clone();
                if self.state.bucket.add(item) {
                    println!("Added {name} to your list");
                } else {
                    println!("{name} is already in your list");
                }
                self.print_bucket();
            }
            Command::Remove { id } => {
                if self.state.bucket.remove(PlaceID(id)) {
                    println!("Removed #{id} from your list");
                } else {
                    println!("#{id} isn't in your list");
                }
                self.print_bucket();
            }
            Command::Move { id, position } => {
                if position == 0 {
                    bail!("Positions count from 1");
                }
                self.state.bucket.move_item(PlaceID(id), position - 1)?;
                self.print_bucket();
            }
            Command::Bucket => self.print_bucket(),
            Command::Route { id } => {
                let id = PlaceID(id);
                let place = match self.state.catalog.lookup(id) {
                    Some(place) => place.clone(),
                    None => self.client.fetch_place(id).await?,
                };
                let label = place
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("Place #{id}"));
                let result = self
                    .state
                    .routes
                    .show_direct(
                        self.state.user_location.as_ref(),
                        place.pos,
                        &label,
                        &*self.client,
                        &mut self.map,
                    )
                    .await
                    .map(|_| ());
                self.after_routing(result).await;
            }
            Command::Trip => {
                let result = self
                    .state
                    .routes
                    .show_bucket(
                        &self.state.bucket,
                        self.state.user_location.as_ref(),
                        &*self.client,
                        &mut self.map,
                    )
                    .await
                    .map(|_| ());
                self.after_routing(result).await;
            }
            Command::Mode { mode } => {
                let result = self
                    .state
                    .routes
                    .set_mode(
                        mode,
                        &self.state.bucket,
                        self.state.user_location.as_ref(),
                        &*self.client,
                        &mut self.map,
                    )
                    .await
                    .map(|route| route.is_some());
                match result {
                    Ok(false) => println!("Travel mode is now {mode}"),
                    Ok(true) => self.after_routing(Ok(())).await,
                    Err(rejection) => println!("Travel mode is now {mode}, but {rejection}"),
                }
            }
            Command::Leg { n } => {
                if n == 0 {
                    bail!("Legs count from 1");
                }
                match self.state.routes.highlight_leg(n - 1, &mut self.map) {
                    Ok(leg) => println!("Leg {n}: {} → {}", leg.from_label, leg.to_label),
                    Err(rejection) => println!("{rejection}"),
                }
            }
            Command::Clear => {
                self.state.routes.clear(&mut self.map);
                println!("Route cleared");
            }
            Command::Base { layer } => {
                if layer.is_empty() {
                    for base in BaseLayer::all() {
                        let mark = if base == self.map.base() { "x" } else { " " };
                        println!("  [{mark}] {base}");
                    }
                } else {
                    let base: BaseLayer = layer.join(" ").parse()?;
                    self.map.set_base(base);
                    println!("Base map is now {base}");
                }
            }
            Command::Export { path } => {
                self.map.export(&path)?;
                println!("Wrote {}", path.display());
            }
            Command::Login { secret } => {
                self.state.admin.login(&secret, &*self.client).await?;
                println!("Logged in as admin");
            }
            Command::Logout => {
                self.state.admin.logout();
                println!("Logged out");
            }
            Command::Admin(cmd) => self.admin(cmd).await?,
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    /// An empty search goes back to the places in view. Otherwise the query waits out the
    /// debounce, and results come back through the channel.
    async fn search(&mut self, text: String) {
        let text = text.trim().to_string();
        if text.is_empty() {
            self.reload_places().await;
            return;
        }
        let (ticket, query) = match self.state.catalog.search_query(&text) {
            Some(x) => x,
            None => {
                self.debouncer.cancel();
                self.pending_search = None;
                self.state.catalog.clear();
                self.map.replace_places(&[]);
                println!("No categories are shown, so nothing matches. Try: categories");
                return;
            }
        };
        self.pending_search = Some(ticket.clone());

        let client = self.client.clone();
        let tx = self.search_tx.clone();
        self.debouncer.schedule(async move {
            let places = match client.fetch_places(&query).await {
                Ok(places) => places,
                Err(err) => {
                    warn!("Search for {text} failed: {err:#}");
                    Vec::new()
                }
            };
            // The receiver only goes away on shutdown
            let _ = tx.send(SearchResults {
                ticket,
                text,
                places,
            });
        });
    }

    fn on_search_results(&mut self, results: SearchResults) {
        if !self.state.catalog.accept(&results.ticket, results.places) {
            debug!("Dropping stale results for {}", results.text);
            return;
        }
        self.pending_search = None;
        self.map.replace_places(self.state.catalog.places());
        println!(
            "{} places match \"{}\"",
            self.state.catalog.places().len(),
            results.text
        );
        println!("{}", describe::place_list(self.state.catalog.places()));
    }

    /// Prints the route the controller just drew, or why it refused to.
    async fn after_routing(&mut self, result: Result<(), model::Rejection>) {
        if let Err(rejection) = result {
            println!("{rejection}");
            return;
        }
        if let Some(route) = self.state.routes.active() {
            println!("{}", summary::itinerary(route));
            if let Some(ref bus) = route.bus {
                println!("{}", summary::bus_cards(bus, Local::now().time()));
            }
        }
        self.state.routes.update_durations(&*self.client).await;
        println!(
            "{}",
            summary::badges(self.state.routes.durations(), self.state.routes.mode())
        );
    }

    fn print_bucket(&self) {
        println!(
            "{}",
            describe::bucket(&self.state.bucket, self.state.user_location.as_ref())
        );
    }

    fn report(&mut self, err: anyhow::Error) {
        if err.is::<Unauthorized>() {
            self.state.admin.logout();
            println!("{err}. Back to the map; log in again with: login <secret>");
        } else {
            println!("Error: {err:#}");
        }
    }

    fn export_if_asked(&self) {
        if let Some(ref path) = self.export {
            if let Err(err) = self.map.export(path) {
                warn!("Couldn't export the map: {err:#}");
            }
        }
    }

    fn savestate(&self) -> Savestate {
        let categories_loaded = !self.state.catalog.categories().is_empty();
        Savestate {
            base: self.map.base(),
            mode: self.state.routes.mode(),
            viewport: self.map.viewport().clone(),
            selected_categories: if categories_loaded {
                Some(self.state.catalog.selected())
            } else {
                self.saved_selection.clone()
            },
        }
    }

    fn before_quit(&self) {
        if let Err(err) = self.savestate().save(&self.data_dir) {
            warn!("Couldn't save the view: {err:#}");
        }
    }
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

async fn run(args: Args) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut app = App::new(args, tx)?;
    app.start().await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt();
        tokio::select! {
            line = lines.next_line() => {
                let line = match line? {
                    Some(line) => line,
                    None => break,
                };
                match parse_line(&line) {
                    Parsed::Blank => continue,
                    Parsed::Message(msg) => println!("{msg}"),
                    Parsed::Command(cmd) => match app.handle(cmd).await {
                        Ok(Flow::Continue) => {}
                        Ok(Flow::Quit) => break,
                        Err(err) => app.report(err),
                    },
                }
                app.export_if_asked();
            }
            Some(results) = rx.recv() => {
                println!();
                app.on_search_results(results);
                app.export_if_asked();
            }
        }
    }

    // Input can end while a search is still out; give it a chance to land
    if app.pending_search.as_ref().map(|t| t.is_current()).unwrap_or(false) {
        let wait = SEARCH_DEBOUNCE + Duration::from_secs(30);
        while let Ok(Some(results)) = tokio::time::timeout(wait, rx.recv()).await {
            app.on_search_results(results);
            if app.pending_search.is_none() {
                app.export_if_asked();
                break;
            }
        }
    }

    app.before_quit();
    Ok(())
}

pub fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = Args::from_args();
    args.apply_env(|key| std::env::var(key).ok());

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("Couldn't start the runtime: {err}");
            std::process::exit(1);
        }
    };
    if let Err(err) = runtime.block_on(run(args)) {
        error!("{err:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_flags() {
        let mut args = Args::from_iter_safe(vec!["tourmap", "--location", "106.9,47.9"]).unwrap();
        assert_eq!(args.location, Some(LonLat::new(106.9, 47.9)));

        args.apply_env(|key| match key {
            "TOURMAP_API" => Some("http://tours.example:8080".to_string()),
            _ => None,
        });
        assert_eq!(args.api, "http://tours.example:8080");
        assert_eq!(args.data_dir, PathBuf::from("data"));

        let mut args =
            Args::from_iter_safe(vec!["tourmap", "--leg-concurrency", "0", "--data-dir", "x"])
                .unwrap();
        args.apply_env(|key| match key {
            "TOURMAP_DATA_DIR" => Some("/var/lib/tourmap".to_string()),
            _ => Some(String::new()),
        });
        assert_eq!(args.api, "http://localhost:5000");
        assert_eq!(args.data_dir, PathBuf::from("/var/lib/tourmap"));
        assert_eq!(args.leg_concurrency, 1);

        assert!(Args::from_iter_safe(vec!["tourmap", "--location", "north"]).is_err());
    }
}
