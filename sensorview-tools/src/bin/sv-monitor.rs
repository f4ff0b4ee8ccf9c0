use clap::Parser;
use sensorview::nav::{SystemClock, TimeNavigator};
use sensorview::view::SequenceViewport;
use sensorview_tools::{init_logging, ViewOpts};

use std::fs::File;
use std::io::{self, stdout, Read, Seek, SeekFrom, Stdout, Write};
use std::path::PathBuf;
use std::time::Duration;

use futures::{future::FutureExt, select, StreamExt};
use futures_timer::Delay;

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{Event, EventStream, KeyCode, KeyEvent, KeyModifiers},
    style::{Attribute, Color, Print, SetAttribute, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
    ExecutableCommand, QueueableCommand,
};

#[derive(Parser, Debug)]
#[command(name = "sv-monitor", version, about = "Follow a growing log file")]
struct Cli {
    /// Log file to follow
    file: PathBuf,

    #[command(flatten)]
    view: ViewOpts,

    /// Start scrolled to the top instead of following the tail
    #[arg(long)]
    no_follow: bool,

    /// Input poll interval in milliseconds
    #[arg(long, default_value_t = 100)]
    poll_ms: u64,
}

/// Lines of a file read incrementally from the last known offset.
struct LogTail {
    path: PathBuf,
    offset: u64,
    partial: Vec<u8>,
    lines: Vec<String>,
}

impl LogTail {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            offset: 0,
            partial: vec![],
            lines: vec![],
        }
    }

    /// Reads appended bytes. Returns true when the line list was reset
    /// because the file shrank.
    fn refresh(&mut self) -> io::Result<bool> {
        let mut file = File::open(&self.path)?;
        let len = file.metadata()?.len();
        let truncated = len < self.offset;
        if truncated {
            tracing::debug!(path = %self.path.display(), "file truncated, rereading");
            self.offset = 0;
            self.partial.clear();
            self.lines.clear();
        }
        if len == self.offset {
            return Ok(truncated);
        }

        file.seek(SeekFrom::Start(self.offset))?;
        let mut chunk = Vec::with_capacity((len - self.offset) as usize);
        let read = file.take(len - self.offset).read_to_end(&mut chunk)?;
        self.offset += read as u64;

        self.partial.extend_from_slice(&chunk);
        while let Some(pos) = self.partial.iter().position(|&b| b == b'\n') {
            let rest = self.partial.split_off(pos + 1);
            let line = std::mem::replace(&mut self.partial, rest);
            let text = String::from_utf8_lossy(&line);
            self.lines
                .push(text.trim_end_matches(['\n', '\r']).to_string());
        }
        Ok(truncated)
    }
}

struct Monitor {
    tail: LogTail,
    viewport: SequenceViewport,
    width: u16,
    status: Option<String>,
}

impl Monitor {
    fn sync(&mut self) {
        match self.tail.refresh() {
            Ok(truncated) => {
                if truncated {
                    self.viewport.clear();
                }
                self.viewport.set_total_count(self.tail.lines.len());
                self.status = None;
            }
            Err(e) => self.status = Some(e.to_string()),
        }
    }

    fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.viewport
            .set_viewport_extent(u32::from(height.saturating_sub(1)));
    }

    fn draw(&self, out: &mut Stdout) -> io::Result<()> {
        let follow = if self.viewport.follow_mode() {
            "follow"
        } else {
            "paused"
        };
        let range = self
            .viewport
            .visible_items()
            .map(|r| format!("{}-{}", r.first + 1, r.last + 1))
            .unwrap_or_else(|| "-".to_string());
        let header = format!(
            " {}  lines {} of {}  [{}]  {}  {}",
            self.tail.path.display(),
            range,
            self.tail.lines.len(),
            follow,
            chrono::Local::now().format("%H:%M:%S"),
            self.status.as_deref().unwrap_or("q quit, f follow, arrows/page scroll"),
        );

        out.queue(MoveTo(0, 0))?
            .queue(SetAttribute(Attribute::Reverse))?
            .queue(Clear(ClearType::CurrentLine))?
            .queue(Print(clip(&header, self.width)))?
            .queue(SetAttribute(Attribute::Reset))?;

        let mut row: u16 = 1;
        if let Some(visible) = self.viewport.visible_items() {
            for line in &self.tail.lines[visible.first..=visible.last] {
                out.queue(MoveTo(0, row))?
                    .queue(Clear(ClearType::CurrentLine))?
                    .queue(Print(clip(line, self.width)))?;
                row += 1;
            }
        }
        out.queue(MoveTo(0, row))?
            .queue(Clear(ClearType::FromCursorDown))?;
        out.flush()
    }

    /// Returns false when the user asked to quit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return false,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return false,
            KeyCode::Char('f') => {
                let follow = !self.viewport.follow_mode();
                self.viewport.set_follow(follow);
            }
            KeyCode::Up | KeyCode::Char('k') => self.viewport.scroll_by(-1),
            KeyCode::Down | KeyCode::Char('j') => self.viewport.scroll_by(1),
            KeyCode::PageUp => self.viewport.page_up(),
            KeyCode::PageDown | KeyCode::Char(' ') => self.viewport.page_down(),
            KeyCode::Home | KeyCode::Char('g') => self.viewport.scroll_to_start(),
            KeyCode::End | KeyCode::Char('G') => self.viewport.set_follow(true),
            _ => {}
        }
        true
    }
}

fn clip(text: &str, width: u16) -> String {
    text.chars().take(usize::from(width)).collect()
}

async fn run_monitor(cli: Cli) -> io::Result<()> {
    let config = cli
        .view
        .load()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let mut navigator = TimeNavigator::with_config(SystemClock, &config);
    let (width, height) = terminal::size()?;

    let mut monitor = Monitor {
        tail: LogTail::new(cli.file.clone()),
        // One terminal row per line.
        viewport: SequenceViewport::new(1)
            .with_overscan(config.overscan)
            .with_follow(!cli.no_follow),
        width,
        status: None,
    };
    monitor.resize(width, height);
    monitor.sync();

    let mut stdout = stdout();
    let mut reader = EventStream::new();
    let poll = Duration::from_millis(cli.poll_ms.max(10));

    'drawing: loop {
        monitor.draw(&mut stdout)?;

        let mut delay = Delay::new(poll).fuse();
        let mut event = reader.next().fuse();

        select! {
            _ = delay => {
                // The live tick paces re-reads of the file.
                if navigator.tick().is_some() {
                    monitor.sync();
                }
            },
            some_event = event => {
                match some_event {
                    Some(Ok(Event::Key(key))) => {
                        if !monitor.handle_key(key) {
                            break 'drawing;
                        }
                    }
                    Some(Ok(Event::Resize(w, h))) => monitor.resize(w, h),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => monitor.status = Some(e.to_string()),
                    None => break 'drawing,
                }
            }
        }
    }
    Ok(())
}

fn main() -> io::Result<()> {
    let cli = Cli::parse();
    init_logging(false);

    let mut stdout = stdout();

    //setup terminal
    enable_raw_mode()?;
    stdout.execute(EnterAlternateScreen)?;
    stdout.execute(SetBackgroundColor(Color::Black))?;
    stdout.execute(SetForegroundColor(Color::White))?;
    stdout.execute(Clear(ClearType::All))?;
    stdout.execute(Hide)?;

    let result = async_std::task::block_on(run_monitor(cli));

    //clean up terminal on end
    stdout.execute(LeaveAlternateScreen)?;
    stdout.execute(Show)?;
    disable_raw_mode()?;

    result
}
