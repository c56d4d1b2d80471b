use super::ActionProgress;
use super::PublisherApp;
use auto_publisher::{ContentType, EventKind};
use egui::{Align, Color32, RichText};
use rfd::FileDialog;

const ACCENT: Color32 = Color32::from_rgb(161, 89, 225);
const ERROR_RED: Color32 = Color32::from_rgb(220, 50, 50);

impl PublisherApp {
    pub fn render(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let total_height = ui.available_height();
            let footer_height = 40.0;
            let footer_margin = 15.0;
            let content_height = total_height - footer_height - footer_margin;

            egui::ScrollArea::vertical()
                .max_height(content_height)
                .show(ui, |ui| {
                    ui.add_space(20.0);
                    ui.vertical_centered(|ui| {
                        ui.heading("Auto Publisher");
                        ui.add_space(5.0);
                        ui.label(
                            RichText::new("Publish folders of photos and videos in batches")
                                .color(ui.visuals().text_color().gamma_multiply(0.7)),
                        );
                    });

                    ui.add_space(20.0);
                    self.render_account(ui);
                    ui.add_space(10.0);
                    self.render_job(ui);
                    ui.add_space(20.0);
                    self.render_actions(ui);
                    ui.add_space(20.0);

                    if !matches!(self.state.progress, ActionProgress::NotStarted) {
                        ui.group(|ui| {
                            if self.state.is_uploading() {
                                ui.horizontal(|ui| {
                                    ui.spinner();
                                    ui.label(self.state.get_status_text());
                                });
                            } else {
                                ui.label(self.state.get_status_text());
                            }
                        });
                    }

                    if let Some(watch_text) = self.state.get_watch_text() {
                        ui.add_space(10.0);
                        ui.colored_label(ACCENT, watch_text);
                    }

                    if !self.state.events.is_empty() {
                        ui.add_space(10.0);
                        self.render_details(ui);
                    }

                    ui.add_space(20.0);
                });

            ui.with_layout(egui::Layout::bottom_up(Align::Center), |ui| {
                ui.add_space(footer_margin);
                self.render_footer(ui);
            });
        });
    }

    fn render_account(&mut self, ui: &mut egui::Ui) {
        ui.group(|ui| {
            ui.label("Account");
            ui.add_space(8.0);
            egui::Grid::new("account_grid")
                .num_columns(2)
                .spacing([12.0, 8.0])
                .show(ui, |ui| {
                    ui.label("Login");
                    ui.add(
                        egui::TextEdit::singleline(&mut self.form.account_id)
                            .hint_text("name@example.com"),
                    );
                    ui.end_row();

                    ui.label("Password");
                    ui.add(egui::TextEdit::singleline(&mut self.form.secret).password(true));
                    ui.end_row();
                });
        });
    }

    fn render_job(&mut self, ui: &mut egui::Ui) {
        ui.group(|ui| {
            ui.horizontal(|ui| {
                if ui.button("📁 Select Folder").clicked() {
                    if let Some(path) = FileDialog::new().pick_folder() {
                        self.form.folder_path = Some(path.display().to_string());
                    }
                }
                if let Some(folder) = &self.form.folder_path {
                    ui.label(format!("Selected: {}", folder));
                    if ui.small_button("Open").clicked() {
                        if let Err(e) = open::that(folder) {
                            tracing::warn!(folder = %folder, error = %e, "Could not open folder");
                        }
                    }
                }
            });

            ui.add_space(8.0);
            egui::Grid::new("job_grid")
                .num_columns(2)
                .spacing([12.0, 8.0])
                .show(ui, |ui| {
                    ui.label("Content");
                    egui::ComboBox::from_id_source("content_type")
                        .selected_text(self.form.content_type.to_string())
                        .show_ui(ui, |ui| {
                            for content_type in ContentType::ALL {
                                ui.selectable_value(
                                    &mut self.form.content_type,
                                    content_type,
                                    content_type.to_string(),
                                );
                            }
                        });
                    ui.end_row();

                    ui.label("Price");
                    ui.add(egui::TextEdit::singleline(&mut self.form.price).hint_text("9.50"));
                    ui.end_row();

                    ui.label("Destination");
                    ui.add(
                        egui::TextEdit::singleline(&mut self.form.destination_query)
                            .hint_text("Tag or album to publish into"),
                    );
                    ui.end_row();

                    ui.label("Description");
                    ui.add(
                        egui::TextEdit::multiline(&mut self.form.description)
                            .desired_rows(3)
                            .hint_text("Optional"),
                    );
                    ui.end_row();

                    ui.label("Batch size");
                    ui.add(
                        egui::DragValue::new(&mut self.form.batch_size)
                            .clamp_range(self.form.content_type.batch_size_range()),
                    );
                    ui.end_row();

                    ui.label("Check every");
                    ui.add(
                        egui::DragValue::new(&mut self.form.poll_interval_secs)
                            .clamp_range(10..=86_400)
                            .suffix(" s"),
                    );
                    ui.end_row();

                    ui.label("Max per check");
                    ui.add(
                        egui::DragValue::new(&mut self.form.max_files_per_check)
                            .clamp_range(1..=10_000),
                    );
                    ui.end_row();
                });
        });
    }

    fn render_actions(&mut self, ui: &mut egui::Ui) {
        let uploading = self.state.is_uploading();
        let watching = self.state.is_watching();
        let ready = self.form.folder_path.is_some()
            && !self.form.account_id.trim().is_empty()
            && !self.form.secret.is_empty();

        ui.vertical_centered(|ui| {
            if uploading {
                let button = egui::Button::new("⛔ Cancel").min_size(egui::vec2(200.0, 40.0));
                if ui.add(button).clicked() {
                    self.cancel_upload();
                }
            } else {
                ui.add_enabled_ui(ready && !watching, |ui| {
                    let button =
                        egui::Button::new("📤 Upload Now").min_size(egui::vec2(200.0, 40.0));
                    if ui.add(button).clicked() {
                        self.start_upload();
                    }
                });
            }

            ui.add_space(5.0);
            if watching {
                if ui.button("⏹ Stop Watching").clicked() {
                    self.stop_watching();
                }
            } else {
                ui.add_enabled_ui(ready && !uploading, |ui| {
                    if ui.button("👁 Start Watching").clicked() {
                        self.start_watching();
                    }
                });
            }
        });
    }

    fn render_details(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui
                .button(if self.state.show_details {
                    "Hide Details"
                } else {
                    "Show Details"
                })
                .clicked()
            {
                self.state.show_details = !self.state.show_details;
            }
            if ui.button("🗑 Clear").clicked() {
                self.state.events.clear();
            }
        });

        if self.state.show_details {
            egui::ScrollArea::vertical()
                .max_height(200.0)
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    egui::Frame::none()
                        .fill(ui.style().visuals.extreme_bg_color)
                        .show(ui, |ui| {
                            ui.add_space(8.0);
                            for event in &self.state.events {
                                let (icon, color) = match event.kind {
                                    EventKind::Info => ("ℹ", Color32::from_rgb(150, 150, 150)),
                                    EventKind::Success => ("✅", Color32::from_rgb(0, 180, 0)),
                                    EventKind::Warning => ("⚠", Color32::from_rgb(230, 160, 0)),
                                    EventKind::Error => ("❌", ERROR_RED),
                                };
                                ui.horizontal(|ui| {
                                    ui.label(icon);
                                    ui.colored_label(color, &event.message);
                                });
                                ui.add_space(4.0);
                            }
                            ui.add_space(8.0);
                        });
                });
        }
    }

    fn render_footer(&self, ui: &mut egui::Ui) {
        ui.horizontal_centered(|ui| {
            ui.label(
                RichText::new(format!("Driver: {}", self.config.webdriver_url))
                    .color(ui.visuals().text_color().gamma_multiply(0.6)),
            );
            let state_dir = &self.config.state_dir;
            if ui
                .add(
                    egui::Label::new(RichText::new("upload records").color(ACCENT))
                        .sense(egui::Sense::click()),
                )
                .clicked()
            {
                if let Err(e) = open::that(state_dir) {
                    tracing::warn!(dir = %state_dir.display(), error = %e, "Could not open state dir");
                }
            }
        });

        if let Some(error) = &self.state.error_message {
            ui.add_space(5.0);
            ui.vertical_centered(|ui| {
                ui.colored_label(ERROR_RED, error);
            });
        }
    }
}
