use std::{path::PathBuf, rc::Rc};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tube_frontend_rs::{
    ClientConfig, EngagementState, PendingToggle, RemoteClient, SessionPhase, SessionStore,
    ToggleError,
    storage::FileStorage,
    views::{AuthForm, ChannelView, FeedView, VideoView},
};
use tube_types::{
    ALL_CATEGORIES, CATEGORIES, Comment, LoginRequest, NewChannel, NewVideo, RegisterRequest, Video,
};

/// Browse, like and comment on videos from the terminal
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Base URL of the REST API (defaults to TUBE_API_URL, then http://localhost:5000/api)
    #[arg(long)]
    api_url: Option<String>,

    /// File holding the session token between runs
    #[arg(long, env = "TUBE_TOKEN_FILE")]
    token_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an account and log in with it
    Register {
        username: String,
        email: String,
        #[arg(long, env = "TUBE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Log in and remember the session
    Login {
        email: String,
        #[arg(long, env = "TUBE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show who the stored session belongs to
    Whoami,
    /// List the home feed
    Videos {
        #[arg(short, long, default_value = ALL_CATEGORIES)]
        category: String,
    },
    /// Search videos by title, description or channel name
    Search { query: String },
    /// Show a video with its channel and comments
    Show {
        id: String,
        /// Also list other videos from the feed
        #[arg(long)]
        related: bool,
    },
    /// Toggle your like on a video
    Like { id: String },
    /// Toggle your dislike on a video
    Dislike { id: String },
    /// Toggle your subscription to a video's channel
    Subscribe { id: String },
    /// Comment on a video
    Comment { video: String, text: String },
    /// Delete one of your comments
    Uncomment { video: String, comment: String },
    /// Show your channel
    Channel,
    /// Create your channel
    CreateChannel {
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        banner: String,
    },
    /// Delete your channel and its videos
    DeleteChannel,
    /// Publish a video on your channel
    Upload {
        title: String,
        url: String,
        #[arg(short, long, default_value = "")]
        description: String,
        #[arg(short, long, default_value = "")]
        category: String,
        #[arg(long, default_value = "")]
        thumbnail: String,
    },
}

fn default_token_file() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".tube").join("token"),
        None => PathBuf::from(".tube-token"),
    }
}

async fn open_session(args: &Args) -> Result<Rc<SessionStore>> {
    let mut config = ClientConfig::from_env();
    if let Some(url) = &args.api_url {
        config = config.with_api_url(url.clone());
    }
    let api = RemoteClient::new(&config).context("Failed to set up the API client")?;

    let path = args.token_file.clone().unwrap_or_else(default_token_file);
    log::debug!("Using token file {}", path.display());
    let session = SessionStore::open(api, Rc::new(FileStorage::new(path)));

    if session.phase() == SessionPhase::Resolving {
        if let Err(e) = session.resolve().await {
            log::warn!("Stored session could not be restored: {e}");
        }
    }
    Ok(session)
}

fn format_date(date: Option<DateTime<Utc>>) -> String {
    date.map(|d| d.format("%b %-d, %Y").to_string())
        .unwrap_or_default()
}

fn format_state(label: &str, state: Option<EngagementState>) -> String {
    match state {
        Some(EngagementState { active: true, count }) => format!("{count} {label} (yours)"),
        Some(EngagementState { count, .. }) => format!("{count} {label}"),
        None => format!("? {label}"),
    }
}

fn print_card(video: &Video, likes: Option<EngagementState>) {
    println!(
        "{:<26} {}  [{}]  {}  {} views, {}",
        video.id,
        video.title,
        video.category,
        video.channel_name(),
        video.views,
        format_state("likes", likes),
    );
}

fn print_comment(comment: &Comment, deletable: bool) {
    let author = comment
        .user_id
        .as_ref()
        .and_then(|u| u.username())
        .unwrap_or("Unknown");
    let marker = if deletable { "*" } else { " " };
    println!(
        " {marker} {} {author} ({}): {}",
        comment.id,
        format_date(comment.created_at),
        comment.text
    );
}

/// Waits for a toggle, showing the optimistic guess first.
async fn settle(label: &str, toggle: Result<PendingToggle, ToggleError>) -> Result<()> {
    let pending = toggle.with_context(|| format!("Cannot {label}"))?;
    println!("{label}: {} (sending)", format_state("total", Some(pending.optimistic())));
    let state = pending
        .await
        .with_context(|| format!("Could not {label}, change was rolled back"))?;
    println!("{label}: {}", format_state("total", Some(state)));
    Ok(())
}

/// Fetches a video for an action on it, without counting a view.
async fn fetch_video(session: &Rc<SessionStore>, id: &str) -> Result<VideoView> {
    let view = VideoView::new(session.clone());
    view.fetch(id)
        .await
        .with_context(|| format!("Failed to load video {id}"))?;
    Ok(view)
}

async fn show_video(session: &Rc<SessionStore>, id: &str, related: bool) -> Result<()> {
    let view = VideoView::new(session.clone());
    view.load(id)
        .await
        .with_context(|| format!("Failed to load video {id}"))?;
    if session.is_logged_in() {
        if let Err(e) = view.refresh_status().await {
            log::warn!("Could not refresh engagement status: {e}");
        }
    }
    let Some(video) = view.video() else {
        bail!("Video {id} went away while loading");
    };

    println!("{}", video.title);
    println!("{} views  {}", video.views, format_date(video.created_at));
    println!(
        "{}, {}",
        format_state("likes", view.like_state()),
        format_state("dislikes", view.dislike_state())
    );
    match view.channel() {
        Some(channel) => println!(
            "{}  {}",
            channel.channel_name,
            format_state("subscribers", view.subscription_state())
        ),
        None => println!("{}", video.channel_name()),
    }
    println!("{}", view.embed_url().unwrap_or_else(|| video.video_url.clone()));
    if !video.description.is_empty() {
        println!("\n{}", video.description);
    }

    let comments = view.comments();
    println!("\n{} comments", comments.len());
    for comment in &comments {
        print_comment(comment, view.can_delete(comment));
    }

    if related {
        let feed = FeedView::new(session.clone());
        feed.load().await.context("Failed to load the feed")?;
        println!("\nRelated");
        for video in view.related(&feed.all_videos()) {
            print_card(&video, feed.like_state(&video.id));
        }
    }
    Ok(())
}

fn print_phase(session: &SessionStore) {
    match (session.phase(), session.user()) {
        (SessionPhase::Anonymous, _) | (_, None) => println!("Not logged in"),
        (SessionPhase::NoChannel, Some(user)) => {
            println!("{} ({}), no channel yet", user.username, user.id)
        }
        (_, Some(user)) => println!(
            "{} ({}), channel {}",
            user.username,
            user.id,
            session
                .channel()
                .map(|c| c.channel_name)
                .unwrap_or_default()
        ),
    }
}

async fn run(args: Args) -> Result<()> {
    let session = open_session(&args).await?;

    match args.command {
        Command::Register {
            username,
            email,
            password,
        } => {
            let form = RegisterRequest {
                username,
                email,
                password,
            };
            AuthForm::new(session.clone())
                .register(&form)
                .await
                .context("Registration failed")?;
            print_phase(&session);
        }
        Command::Login { email, password } => {
            AuthForm::new(session.clone())
                .login(&LoginRequest { email, password })
                .await
                .context("Login failed")?;
            print_phase(&session);
        }
        Command::Logout => {
            session.logout();
            println!("Logged out");
        }
        Command::Whoami => print_phase(&session),
        Command::Videos { category } => {
            if !CATEGORIES.contains(&category.as_str()) {
                log::warn!("Unknown category {category:?}, known: {}", CATEGORIES.join(", "));
            }
            let feed = FeedView::new(session.clone());
            feed.load().await.context("Failed to load the feed")?;
            feed.refresh_like_status().await;
            feed.select_category(&category);
            for video in feed.videos() {
                print_card(&video, feed.like_state(&video.id));
            }
        }
        Command::Search { query } => {
            let feed = FeedView::new(session.clone());
            let results = feed.search(&query).await.context("Search failed")?;
            if results.is_empty() {
                println!("No videos found");
            }
            for video in &results {
                print_card(video, Some(EngagementState::new(video.is_liked, video.likes.get())));
            }
        }
        Command::Show { id, related } => show_video(&session, &id, related).await?,
        Command::Like { id } => {
            let view = fetch_video(&session, &id).await?;
            settle("like", view.like()).await?;
        }
        Command::Dislike { id } => {
            let view = fetch_video(&session, &id).await?;
            settle("dislike", view.dislike()).await?;
        }
        Command::Subscribe { id } => {
            let view = fetch_video(&session, &id).await?;
            settle("subscribe", view.subscribe()).await?;
        }
        Command::Comment { video, text } => {
            let view = fetch_video(&session, &video).await?;
            let comment = view
                .add_comment(&text)
                .await
                .context("Failed to post comment")?;
            print_comment(&comment, true);
        }
        Command::Uncomment { video, comment } => {
            let view = fetch_video(&session, &video).await?;
            let Some(target) = view.comments().into_iter().find(|c| c.id == comment) else {
                bail!("No comment {comment} on video {video}");
            };
            if !view.can_delete(&target) {
                bail!("Comment {comment} is not yours");
            }
            view.delete_comment(&comment)
                .await
                .context("Failed to delete comment")?;
            println!("Deleted comment {comment}");
        }
        Command::Channel => {
            let view = ChannelView::new(session.clone());
            match view.load().await.context("Failed to load your channel")? {
                Some(channel) => {
                    println!("{} ({})", channel.channel_name, channel.id);
                    println!("{} subscribers", channel.subscribers.get());
                    if !channel.description.is_empty() {
                        println!("{}", channel.description);
                    }
                    for video in &channel.videos {
                        println!("  {}", video.id());
                    }
                }
                None => println!("You have no channel yet"),
            }
        }
        Command::CreateChannel {
            name,
            description,
            banner,
        } => {
            let view = ChannelView::new(session.clone());
            let channel = view
                .create_channel(&NewChannel {
                    channel_name: name,
                    description,
                    channel_banner: banner,
                })
                .await
                .context("Failed to create channel")?;
            println!("Created channel {} ({})", channel.channel_name, channel.id);
        }
        Command::DeleteChannel => {
            let view = ChannelView::new(session.clone());
            view.delete_channel()
                .await
                .context("Failed to delete channel")?;
            println!("Channel deleted");
        }
        Command::Upload {
            title,
            url,
            description,
            category,
            thumbnail,
        } => {
            let view = ChannelView::new(session.clone());
            let video = view
                .upload_video(NewVideo {
                    title,
                    description,
                    category,
                    video_url: url,
                    thumbnail_url: thumbnail,
                    channel_id: String::new(),
                })
                .await
                .context("Failed to upload video")?;
            println!("Uploaded {} ({})", video.title, video.id);
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env file if it exists
    dotenv::dotenv().ok();
    env_logger::init();

    // views spawn their engagement requests on the current thread
    tokio::task::LocalSet::new()
        .run_until(run(Args::parse()))
        .await
}
