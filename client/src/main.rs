use std::path::PathBuf;

use chrono::Utc;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use vidshare_client::api::{Channel, Comment, Video};
use vidshare_client::app::{App, Feed, Notice, Theme, ViewScope};
use vidshare_client::config::ClientConfig;
use vidshare_client::format::{embed_url, format_number, time_ago};
use vidshare_client::validation::{
    ChannelForm, CommentForm, SignInForm, SignUpForm, UserUpdateForm, VideoForm, parse_tags,
};

#[derive(Parser)]
#[command(name = "vidshare-client", about = "Terminal client for the Vidshare video service")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, default_value = "vidshare.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and remember the session.
    Signin { username: String, password: String },
    /// Create an account.
    Signup {
        username: String,
        email: String,
        password: String,
        #[arg(long)]
        avatar: Option<String>,
    },
    Signout,
    /// Show the signed-in identity.
    Whoami,
    /// Update username, email or avatar.
    Profile {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        avatar: Option<String>,
    },
    DeleteAccount,
    /// Home feed, optionally filtered by category.
    Feed {
        #[arg(long)]
        tag: Option<String>,
    },
    /// List the home-page filter categories.
    Categories,
    Search { query: String },
    /// Show a video, its channel, comments and recommendations.
    Watch { video_id: String },
    Like { video_id: String },
    Dislike { video_id: String },
    /// Toggle the subscription to a channel.
    Subscribe { channel_id: String },
    #[command(subcommand)]
    Channel(ChannelCommand),
    #[command(subcommand)]
    Video(VideoCommand),
    #[command(subcommand)]
    Comments(CommentCommand),
    /// Show the colour theme, or flip it.
    Theme {
        #[arg(long)]
        toggle: bool,
    },
}

#[derive(clap::Args)]
struct ChannelArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    handle: String,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    avatar: Option<String>,
    #[arg(long)]
    banner: Option<String>,
}

impl From<ChannelArgs> for ChannelForm {
    fn from(a: ChannelArgs) -> Self {
        ChannelForm {
            channel_name: a.name,
            handle: a.handle,
            description: a.description,
            channel_avatar: a.avatar.unwrap_or_default(),
            channel_banner: a.banner.unwrap_or_default(),
        }
    }
}

#[derive(Subcommand)]
enum ChannelCommand {
    Show { channel_id: String },
    /// Channels owned by the signed-in identity.
    Mine,
    Create(ChannelArgs),
    Update {
        channel_id: String,
        #[command(flatten)]
        args: ChannelArgs,
    },
    Delete { channel_id: String },
}

#[derive(clap::Args)]
struct VideoArgs {
    #[arg(long)]
    title: String,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    thumbnail: String,
    #[arg(long, default_value = "")]
    url: String,
    /// Comma-separated tags.
    #[arg(long)]
    tags: Option<String>,
}

impl From<VideoArgs> for VideoForm {
    fn from(a: VideoArgs) -> Self {
        VideoForm {
            title: a.title,
            description: a.description,
            thumbnail_url: a.thumbnail,
            video_url: a.url,
            tags: a.tags.as_deref().map(parse_tags),
        }
    }
}

#[derive(Subcommand)]
enum VideoCommand {
    Upload {
        /// Target channel; defaults to the first owned channel.
        #[arg(long)]
        channel: Option<String>,
        #[command(flatten)]
        args: VideoArgs,
    },
    Edit {
        video_id: String,
        #[command(flatten)]
        args: VideoArgs,
    },
    Delete { video_id: String },
}

#[derive(Subcommand)]
enum CommentCommand {
    List { video_id: String },
    Add { video_id: String, text: String },
    Edit { comment_id: String, text: String },
    Delete { comment_id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::load(&cli.config)?;
    let (app, notices) = App::from_config(&config)?;

    // The command is one view; Ctrl-C tears it down.
    let scope = ViewScope::new();
    let cancel = scope.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let printer = tokio::spawn(print_notices(notices));
    let outcome = run(&app, &scope, cli.command).await;

    // Dropping the app closes the notice channel so the printer drains and exits.
    drop(app);
    if let Err(e) = printer.await {
        warn!(error = %e, "notice printer panicked");
    }

    match outcome {
        Err(e) if e.is_cancelled() => {
            eprintln!("Interrupted.");
            std::process::exit(130);
        }
        Err(_) => std::process::exit(1),
        Ok(()) => Ok(()),
    }
}

async fn print_notices(mut rx: mpsc::UnboundedReceiver<Notice>) {
    while let Some(notice) = rx.recv().await {
        eprintln!("{notice}");
    }
}

async fn run(app: &App, scope: &ViewScope, command: Command) -> vidshare_client::error::Result<()> {
    match command {
        Command::Signin { username, password } => {
            let user = app.sign_in(scope, SignInForm { username, password }).await?;
            println!("Signed in as {} <{}>", user.username, user.email);
        }
        Command::Signup {
            username,
            email,
            password,
            avatar,
        } => {
            let form = SignUpForm {
                username,
                email,
                password,
                avatar: avatar.unwrap_or_default(),
            };
            app.sign_up(scope, form).await?;
        }
        Command::Signout => app.sign_out(),
        Command::Whoami => match app.refresh_session(scope).await? {
            Some(user) => {
                println!("{} <{}>", user.username, user.email);
                println!("  channels:    {}", user.channels.len());
                println!("  subscribed:  {}", user.subscribed_channels.len());
            }
            None => println!("Not signed in."),
        },
        Command::Profile {
            username,
            email,
            avatar,
        } => {
            let form = UserUpdateForm {
                username,
                email,
                avatar: avatar.unwrap_or_default(),
            };
            app.update_profile(scope, form).await?;
        }
        Command::DeleteAccount => app.delete_account(scope).await?,
        Command::Feed { tag } => {
            let feed = tag.as_deref().map_or(Feed::All, Feed::from_filter);
            print_videos(&app.home_feed(scope, &feed).await?);
        }
        Command::Categories => {
            for category in vidshare_client::app::FILTER_CATEGORIES {
                println!("{category}");
            }
        }
        Command::Search { query } => {
            let videos = app.search(scope, &query).await?;
            if videos.is_empty() {
                println!("No videos found.");
            }
            print_videos(&videos);
        }
        Command::Watch { video_id } => watch(app, scope, &video_id).await?,
        Command::Like { video_id } => {
            app.open_video(scope, &video_id).await?;
            app.toggle_like(scope).await?;
            print_votes(app);
        }
        Command::Dislike { video_id } => {
            app.open_video(scope, &video_id).await?;
            app.toggle_dislike(scope).await?;
            print_votes(app);
        }
        Command::Subscribe { channel_id } => {
            let mut page = app.open_channel(scope, &channel_id).await?;
            let subscribed = app.toggle_subscription(scope, &mut page.channel).await?;
            println!(
                "{} {} ({} subscribers)",
                if subscribed { "Subscribed to" } else { "Unsubscribed from" },
                page.channel.channel_name,
                format_number(Some(page.channel.subscribers))
            );
        }
        Command::Channel(cmd) => channel(app, scope, cmd).await?,
        Command::Video(cmd) => video(app, scope, cmd).await?,
        Command::Comments(cmd) => comments(app, scope, cmd).await?,
        Command::Theme { toggle } => {
            let theme = if toggle { app.toggle_theme() } else { app.theme() };
            println!(
                "{} mode",
                if theme == Theme::Dark { "Dark" } else { "Light" }
            );
        }
    }
    Ok(())
}

async fn watch(app: &App, scope: &ViewScope, video_id: &str) -> vidshare_client::error::Result<()> {
    let page = app.open_video(scope, video_id).await?;
    let video = &page.video;

    println!("{}", video.title);
    if let Some(url) = &video.video_url {
        println!("  {}", embed_url(url));
    }
    println!(
        "  {} views{}",
        format_number(Some(video.views)),
        video
            .created_at
            .map(|t| format!(" • {}", time_ago(t, Utc::now())))
            .unwrap_or_default()
    );
    print_votes(app);
    print_channel_line(&page.channel, app);
    if let Some(description) = &video.description {
        println!("\n{description}");
    }

    let comments = app.comments(scope, video_id).await?;
    println!("\n{} Comments", comments.len());
    for comment in &comments {
        let author = app
            .comment_author(scope, &comment.user_id)
            .await
            .map(|u| u.username)
            .unwrap_or_else(|_| "unknown".to_string());
        print_comment(comment, &author);
    }

    let related = app.recommendations(scope, &video.tags).await?;
    let related: Vec<Video> = related.into_iter().filter(|v| v.id != video.id).collect();
    if !related.is_empty() {
        println!("\nUp next");
        print_videos(&related);
    }
    app.leave_video();
    Ok(())
}

async fn channel(app: &App, scope: &ViewScope, cmd: ChannelCommand) -> vidshare_client::error::Result<()> {
    match cmd {
        ChannelCommand::Show { channel_id } => {
            let page = app.open_channel(scope, &channel_id).await?;
            print_channel_line(&page.channel, app);
            if let Some(description) = &page.channel.description {
                println!("  {description}");
            }
            print_videos(&page.videos);
        }
        ChannelCommand::Mine => {
            let channels = app.my_channels(scope).await?;
            if channels.is_empty() {
                println!("You have no channels yet.");
            }
            for channel in &channels {
                print_channel_line(channel, app);
            }
        }
        ChannelCommand::Create(args) => {
            let channel = app.create_channel(scope, args.into()).await?;
            println!("{} ({})", channel.id, channel.handle);
        }
        ChannelCommand::Update { channel_id, args } => {
            app.update_channel(scope, &channel_id, args.into()).await?;
        }
        ChannelCommand::Delete { channel_id } => app.delete_channel(scope, &channel_id).await?,
    }
    Ok(())
}

async fn video(app: &App, scope: &ViewScope, cmd: VideoCommand) -> vidshare_client::error::Result<()> {
    match cmd {
        VideoCommand::Upload { channel, args } => {
            let video = app.upload_video(scope, channel.as_deref(), args.into()).await?;
            println!("Uploaded {} ({})", video.title, video.id);
        }
        VideoCommand::Edit { video_id, args } => {
            let video = app.edit_video(scope, &video_id, args.into()).await?;
            println!("Saved {} ({})", video.title, video.id);
        }
        VideoCommand::Delete { video_id } => app.delete_video(scope, &video_id).await?,
    }
    Ok(())
}

async fn comments(app: &App, scope: &ViewScope, cmd: CommentCommand) -> vidshare_client::error::Result<()> {
    match cmd {
        CommentCommand::List { video_id } => {
            for comment in app.comments(scope, &video_id).await? {
                print_comment(&comment, &comment.user_id);
            }
        }
        CommentCommand::Add { video_id, text } => {
            let comment = app
                .add_comment(scope, &video_id, CommentForm { description: text })
                .await?;
            println!("{}", comment.id);
        }
        CommentCommand::Edit { comment_id, text } => {
            app.edit_comment(scope, &comment_id, CommentForm { description: text })
                .await?;
        }
        CommentCommand::Delete { comment_id } => app.delete_comment(scope, &comment_id).await?,
    }
    Ok(())
}

fn print_videos(videos: &[Video]) {
    let now = Utc::now();
    for video in videos {
        let age = video
            .created_at
            .map(|t| time_ago(t, now))
            .unwrap_or_default();
        println!(
            "{:<26} {:<48} {:>7} views  {}",
            video.id,
            video.title,
            format_number(Some(video.views)),
            age
        );
    }
}

fn print_votes(app: &App) {
    let Some(video) = app.video().current_video() else {
        return;
    };
    let me = app.session().current_user().map(|u| u.id);
    let mark = |set: &[String]| match &me {
        Some(id) if set.contains(id) => "*",
        _ => "",
    };
    println!(
        "  👍 {}{}  👎 {}{}",
        format_number(Some(video.likes.len() as u64)),
        mark(&video.likes),
        format_number(Some(video.dislikes.len() as u64)),
        mark(&video.dislikes)
    );
}

fn print_channel_line(channel: &Channel, app: &App) {
    let subscribed = app
        .session()
        .current_user()
        .is_some_and(|u| u.is_subscribed_to(&channel.id));
    println!(
        "{} @{} • {} subscribers{}",
        channel.channel_name,
        channel.handle,
        format_number(Some(channel.subscribers)),
        if subscribed { " • subscribed" } else { "" }
    );
}

fn print_comment(comment: &Comment, author: &str) {
    let age = comment
        .created_at
        .map(|t| format!(" {}", time_ago(t, Utc::now())))
        .unwrap_or_default();
    println!("  @{author}{age}\n    {}", comment.description);
}
