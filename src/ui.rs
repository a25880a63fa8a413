use iced::{
    widget::{column, container, image::Handle, row, text, Image},
    Alignment, Element, Length,
};

use crate::worker::{Preview, PREVIEW_SIZE};
use crate::Message;

/// Original and denoised thumbnails shown side by side.
#[derive(Debug, Clone)]
pub struct PreviewView {
    before: Handle,
    after: Handle,
}

impl PreviewView {
    pub fn new(preview: Preview) -> Self {
        let handle = |image: image::RgbaImage| Handle::from_pixels(image.width(), image.height(), image.into_raw());
        Self {
            before: handle(preview.before),
            after: handle(preview.after),
        }
    }

    pub fn view(&self) -> Element<Message> {
        let side = Length::Fixed(PREVIEW_SIZE as f32);
        let panel = |label: &'static str, handle: &Handle| {
            column![text(label).size(16), Image::new(handle.clone()).width(side).height(side)]
                .spacing(5)
                .align_items(Alignment::Center)
        };

        container(row![panel("Before", &self.before), panel("After", &self.after)].spacing(20))
            .width(Length::Fill)
            .center_x()
            .into()
    }
}
