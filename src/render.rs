//! The boundary to whatever draws the console. Renderers receive finished
//! view-models and know nothing about fetching or rules.

use crate::store::StateStore;
use crate::view::{derive_view, ConsoleView, DetailView};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait Renderer: Send + Sync + 'static {
    fn render(&self, view: &ConsoleView);
    fn notify(&self, notice: &Notice);
}

/// Derives the current view from `store` and hands it to `renderer`.
pub fn publish<R: Renderer + ?Sized>(store: &StateStore, renderer: &R) {
    let view = derive_view(&store.snapshot());
    renderer.render(&view);
}

/// Plain-text renderer for the command-line console.
#[derive(Debug, Clone, Default)]
pub struct TerminalRenderer;

impl TerminalRenderer {
    fn print_detail(detail: &DetailView) {
        println!();
        println!("Appointment #{} [{}]", detail.id, detail.status_label);
        println!("  Date:       {}", detail.date);
        println!("  Ends:       {}", detail.end_time);
        println!("  Customer:   {} <{}>", detail.customer, detail.customer_email);
        println!("  Vehicle:    {} ({})", detail.vehicle, detail.license_plate);
        println!("  Staff:      {}", detail.staff);
        println!("  Total:      {}", detail.total);
        println!("  Created:    {}", detail.created_at);
        println!("  Updated:    {}", detail.updated_at);
        println!("  Paid:       {}", detail.paid_at);
        if detail.services.is_empty() {
            println!("  Services:   none");
        } else {
            println!("  Services:");
            for service in &detail.services {
                println!("    - {service}");
            }
        }

        if let Some(reason) = detail.lock_reason {
            println!("  Assignment locked: {}", reason.description());
        } else if detail.show_assign_box {
            if detail.no_staff_warning {
                println!("  No staff available for this time slot.");
            }
            let state = if detail.assign_in_flight {
                "assigning..."
            } else if detail.assign_disabled {
                "disabled"
            } else {
                "enabled"
            };
            println!("  Assign staff ({state}):");
            for option in &detail.staff_options {
                let marker = if option.selected { "*" } else { " " };
                println!("   {marker} {:>5}  {}", option.value, option.label);
            }
        }
        if detail.show_cancel {
            let state = if detail.cancel_in_flight {
                "cancelling..."
            } else {
                "available"
            };
            println!("  Cancel: {state}");
        }
    }
}

impl Renderer for TerminalRenderer {
    fn render(&self, view: &ConsoleView) {
        println!();
        if view.loading {
            println!("Loading...");
        }
        if !view.search.is_empty() {
            println!("Search: \"{}\"", view.search);
        }
        if view.rows.is_empty() {
            println!("No appointments found.");
        } else {
            println!(
                "{:<6} {:<20} {:<20} {:<20} {:<22} {:<16}",
                "ID", "Date", "Customer", "Vehicle", "Status", "Staff"
            );
            for row in &view.rows {
                let status = format!("{} ({})", row.status_label, row.badge.as_str());
                println!(
                    "{:<6} {:<20} {:<20} {:<20} {:<22} {:<16}",
                    row.id, row.date, row.customer, row.vehicle, status, row.staff
                );
            }
        }

        let pagination = &view.pagination;
        println!(
            "Page {}/{}  [prev: {}] [next: {}]",
            pagination.current_page,
            pagination.last_page,
            if pagination.previous_disabled { "off" } else { "on" },
            if pagination.next_disabled { "off" } else { "on" },
        );

        if let Some(detail) = &view.detail {
            Self::print_detail(detail);
        }
    }

    fn notify(&self, notice: &Notice) {
        match notice.kind {
            NoticeKind::Success => println!("[ok] {}", notice.message),
            NoticeKind::Error => eprintln!("[error] {}", notice.message),
        }
    }
}
