use std::time::Duration;

use anyhow::{bail, Context};
use whatsup_api::{CommentId, Notifier, PostId, UserId};
use whatsup_client::{CommentsOverlay, OverlayConfig, Submitted};

mod remote;
use remote::Remote;

#[derive(structopt::StructOpt)]
struct Opt {
    #[structopt(short, long, env = "WHATSUP_HOST")]
    host: String,

    /// Id of the user acting
    #[structopt(short, long, env = "WHATSUP_USER")]
    user: i64,

    /// Owner of the post whose comments to act on
    #[structopt(long)]
    post_owner: i64,

    #[structopt(long)]
    post: i64,

    #[structopt(long, default_value = "10")]
    timeout_secs: u64,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// Print the comment threads
    Show,

    /// Post a comment
    Comment {
        text: String,

        /// Comment to reply to
        #[structopt(long)]
        reply_to: Option<i64>,
    },

    /// Like a comment, or unlike it if already liked
    Like { comment: i64 },

    /// Delete one of your comments
    Delete { comment: i64 },
}

struct Toast;

impl Notifier for Toast {
    fn notify(&self, message: &str) {
        eprintln!("» {message}");
    }
}

fn print_threads<S, N>(overlay: &CommentsOverlay<S, N>)
where
    S: whatsup_api::CommentService,
    N: Notifier,
{
    let rows = overlay.rows();
    if rows.is_empty() {
        println!("(no comments)");
    }
    for r in rows {
        println!("{r}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let opt = <Opt as structopt::StructOpt>::from_args();

    let config = OverlayConfig {
        request_timeout: Duration::from_secs(opt.timeout_secs),
        ..OverlayConfig::default()
    };
    let mut overlay = CommentsOverlay::new(
        Remote::new(opt.host),
        Toast,
        UserId(opt.user),
        UserId(opt.post_owner),
        PostId(opt.post),
        config,
    );
    overlay.load().await.context("loading comments")?;

    match opt.cmd {
        Command::Show => (),
        Command::Comment { text, reply_to } => {
            if let Some(parent) = reply_to {
                overlay.reply_to(CommentId(parent))?;
            }
            let typed = overlay.displayed_text() + &text;
            overlay.edit(&typed);
            match overlay.submit().await? {
                Submitted::Posted(id) => tracing::info!(comment=?id, "posted"),
                Submitted::Rejected => bail!("refusing to post an empty comment"),
            }
        }
        Command::Like { comment } => {
            match overlay.toggle_like(CommentId(comment)).await? {
                Some(intent) => tracing::info!(?intent, "like toggled"),
                None => tracing::warn!("like already being toggled"),
            }
        }
        Command::Delete { comment } => overlay.delete(CommentId(comment)).await?,
    }

    print_threads(&overlay);
    Ok(())
}
