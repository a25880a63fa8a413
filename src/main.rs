use iced::{
    executor,
    widget::{button, column, container, radio, row, slider, text, text_input, Row},
    window, Alignment, Application, Command, Element, Length, Settings, Theme,
};
use std::path::PathBuf;
use tracing::{debug, error, info};
use anyhow::{Context, Result};
use clap::Parser;
use rfd::{AsyncFileDialog, AsyncMessageDialog, MessageButtons, MessageLevel};

mod cli;
mod codec;
mod denoise;
mod error;
mod job;
mod logging;
mod pixels;
mod processors;
mod ui;
mod video;
mod worker;

use codec::{CodecConfig, ImageCodec};
use job::{DenoiseParams, Job, OutputFormat, STRENGTH_RANGE};
use processors::classify;
use ui::PreviewView;
use worker::Preview;

pub fn main() -> Result<()> {
    // Any argument selects the command line
    if std::env::args_os().len() > 1 {
        if let Err(e) = run_cli() {
            error!("{:#}", e);
            std::process::exit(1);
        }
        return Ok(());
    }

    logging::init(false);
    info!("Starting DeGrain...");

    DeGrain::run(Settings {
        window: window::Settings {
            size: (600, 600),
            ..Default::default()
        },
        ..Settings::default()
    })
    .context("Front-end failed")
}

fn run_cli() -> Result<()> {
    let args = cli::Args::parse();
    logging::init(args.verbose);

    let codec = ImageCodec::new(CodecConfig::default());
    let job = args.to_job();
    debug!("Job: {:?}", job);

    let report = processors::run(&job, codec)
        .with_context(|| format!("Processing {} failed", job.input.display()))?;
    info!("{}", report.summary());
    Ok(())
}

struct DeGrain {
    input: String,
    output: String,
    h: u32,
    h_color: u32,
    format: OutputFormat,
    codec: ImageCodec,
    busy: bool,
    previewing: bool,
    preview: Option<PreviewView>,
}

#[derive(Debug, Clone)]
pub enum Message {
    InputChanged(String),
    OutputChanged(String),
    BrowseInput,
    BrowseOutput,
    InputPicked(Option<PathBuf>),
    OutputPicked(Option<PathBuf>),
    HChanged(u32),
    HColorChanged(u32),
    FormatSelected(OutputFormat),
    Preview,
    PreviewReady(Result<Preview, String>),
    Process,
    JobFinished(Result<String, String>),
    DialogClosed,
}

async fn show_dialog(level: MessageLevel, title: &'static str, description: String) {
    AsyncMessageDialog::new()
        .set_level(level)
        .set_title(title)
        .set_description(&description)
        .set_buttons(MessageButtons::Ok)
        .show()
        .await;
}

fn dialog(level: MessageLevel, title: &'static str, description: impl Into<String>) -> Command<Message> {
    Command::perform(show_dialog(level, title, description.into()), |_| Message::DialogClosed)
}

async fn pick_input() -> Option<PathBuf> {
    let file = AsyncFileDialog::new()
        .set_title("Select a video or image")
        .pick_file()
        .await;
    match file {
        Some(file) => Some(file.path().to_path_buf()),
        None => AsyncFileDialog::new()
            .set_title("Select an image folder")
            .pick_folder()
            .await
            .map(|folder| folder.path().to_path_buf()),
    }
}

async fn pick_output(input: PathBuf, format: OutputFormat) -> Option<PathBuf> {
    let picked = if input.is_dir() {
        AsyncFileDialog::new()
            .set_title("Select output folder")
            .pick_folder()
            .await
    } else if classify::is_video_file(&input) {
        AsyncFileDialog::new()
            .set_title("Save denoised video")
            .add_filter("MP4 video", &["mp4"])
            .save_file()
            .await
    } else {
        let ext = format.extension();
        AsyncFileDialog::new()
            .set_title("Save denoised image")
            .add_filter(&ext.to_uppercase(), &[ext])
            .save_file()
            .await
    };
    picked.map(|handle| handle.path().to_path_buf())
}

impl DeGrain {
    fn params(&self) -> DenoiseParams {
        DenoiseParams::new(self.h, self.h_color)
    }
}

impl Application for DeGrain {
    type Message = Message;
    type Theme = Theme;
    type Executor = executor::Default;
    type Flags = ();

    fn new(_flags: ()) -> (Self, Command<Message>) {
        let defaults = DenoiseParams::default();
        (
            Self {
                input: String::new(),
                output: String::new(),
                h: defaults.h,
                h_color: defaults.h_color,
                format: OutputFormat::default(),
                codec: ImageCodec::new(CodecConfig::default()),
                busy: false,
                previewing: false,
                preview: None,
            },
            Command::none(),
        )
    }

    fn title(&self) -> String {
        String::from("DeGrain Batch Processor")
    }

    fn update(&mut self, message: Message) -> Command<Message> {
        match message {
            Message::InputChanged(value) => {
                self.input = value;
                Command::none()
            }
            Message::OutputChanged(value) => {
                self.output = value;
                Command::none()
            }
            Message::BrowseInput => Command::perform(pick_input(), Message::InputPicked),
            Message::BrowseOutput => Command::perform(
                pick_output(PathBuf::from(self.input.trim()), self.format),
                Message::OutputPicked,
            ),
            Message::InputPicked(path) => {
                if let Some(path) = path {
                    debug!("Input selected: {}", path.display());
                    self.input = path.display().to_string();
                }
                Command::none()
            }
            Message::OutputPicked(path) => {
                if let Some(path) = path {
                    debug!("Output selected: {}", path.display());
                    self.output = path.display().to_string();
                }
                Command::none()
            }
            Message::HChanged(h) => {
                self.h = h;
                Command::none()
            }
            Message::HColorChanged(h_color) => {
                self.h_color = h_color;
                Command::none()
            }
            Message::FormatSelected(format) => {
                self.format = format;
                Command::none()
            }
            Message::Preview => {
                if self.input.trim().is_empty() {
                    return dialog(MessageLevel::Warning, "Error", "Please select an input first.");
                }
                self.previewing = true;
                Command::perform(
                    worker::run_preview(PathBuf::from(self.input.trim()), self.params(), self.codec),
                    Message::PreviewReady,
                )
            }
            Message::PreviewReady(result) => {
                self.previewing = false;
                match result {
                    Ok(preview) => {
                        self.preview = Some(PreviewView::new(preview));
                        Command::none()
                    }
                    Err(e) => {
                        error!("Preview failed: {}", e);
                        dialog(MessageLevel::Error, "Error", e)
                    }
                }
            }
            Message::Process => {
                let (input, output) = (self.input.trim(), self.output.trim());
                if input.is_empty() || output.is_empty() {
                    return dialog(
                        MessageLevel::Warning,
                        "Error",
                        "Please select both input and output paths.",
                    );
                }

                let job = Job {
                    input: PathBuf::from(input),
                    output: PathBuf::from(output),
                    params: self.params(),
                    format: self.format,
                };
                info!("Starting job: {} -> {}", job.input.display(), job.output.display());
                self.busy = true;
                Command::perform(worker::run_job(job, self.codec), Message::JobFinished)
            }
            Message::JobFinished(result) => {
                self.busy = false;
                match result {
                    Ok(summary) => {
                        info!("{}", summary);
                        dialog(MessageLevel::Info, "Done", "Processing complete!")
                    }
                    Err(e) => dialog(MessageLevel::Error, "Error", e),
                }
            }
            Message::DialogClosed => Command::none(),
        }
    }

    fn view(&self) -> Element<Message> {
        let label = |s: &'static str| text(s).width(Length::Fixed(110.0));

        let input_row = row![
            label("Input"),
            text_input("Video, image folder or image", &self.input).on_input(Message::InputChanged),
            button("Browse").on_press(Message::BrowseInput),
        ]
        .spacing(10)
        .align_items(Alignment::Center);

        let output_row = row![
            label("Output"),
            text_input("Output video, folder or image", &self.output).on_input(Message::OutputChanged),
            button("Browse").on_press(Message::BrowseOutput),
        ]
        .spacing(10)
        .align_items(Alignment::Center);

        let h_row = row![
            label("Luminance (h)"),
            slider(STRENGTH_RANGE, self.h, Message::HChanged),
            text(self.h).width(Length::Fixed(30.0)),
        ]
        .spacing(10)
        .align_items(Alignment::Center);

        let h_color_row = row![
            label("Colour (hColor)"),
            slider(STRENGTH_RANGE, self.h_color, Message::HColorChanged),
            text(self.h_color).width(Length::Fixed(30.0)),
        ]
        .spacing(10)
        .align_items(Alignment::Center);

        let formats = OutputFormat::ALL.iter().fold(Row::new().push(label("Format")), |row, format| {
            row.push(radio(format.extension(), *format, Some(self.format), Message::FormatSelected))
        });

        let mut preview_button = button("Preview Before/After");
        if !self.previewing {
            preview_button = preview_button.on_press(Message::Preview);
        }
        let mut process_button = button("Process Files");
        if !self.busy {
            process_button = process_button.on_press(Message::Process);
        }
        let status = if self.busy {
            text("Processing...")
        } else if self.previewing {
            text("Rendering preview...")
        } else {
            text("")
        };
        let actions = row![preview_button, process_button, status]
            .spacing(10)
            .align_items(Alignment::Center);

        let preview: Element<Message> = match &self.preview {
            Some(view) => view.view(),
            None => text("No preview").into(),
        };

        let layout = column![
            input_row,
            output_row,
            h_row,
            h_color_row,
            formats.spacing(20).align_items(Alignment::Center),
            actions,
            preview,
        ]
        .spacing(20)
        .padding(20);

        container(layout)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }
}
