use std::sync::OnceLock;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Row, Table, Wrap},
    Frame,
};

use crate::app::{App, MessageKind, Popup, Section};
use crate::theme::Theme;

// Load theme colors once at startup
static THEME: OnceLock<Theme> = OnceLock::new();

fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::load)
}

fn accent() -> Color { theme().accent }
fn danger() -> Color { theme().danger }
fn success() -> Color { theme().success }
fn warning() -> Color { theme().warning }
fn text() -> Color { theme().text }
fn text_dim() -> Color { theme().text_dim }
fn bg_selected() -> Color { theme().bg_selected }
fn inactive() -> Color { theme().inactive }
fn header() -> Color { theme().header }

pub fn draw(f: &mut Frame, app: &App) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Message banner
            Constraint::Min(8),    // Board
            Constraint::Length(1), // Footer
        ])
        .split(area);

    draw_message_line(f, app, chunks[0]);
    draw_board(f, app, chunks[1]);
    draw_footer(f, app, chunks[2]);

    // Draw popups on top
    match app.popup {
        Popup::None => {}
        Popup::Register => draw_register_modal(f, app),
        Popup::Confirm => draw_confirm_popup(f, app),
        Popup::Help => draw_help_popup(f),
    }
}

/// Transient banner line, auto-cleared by App::tick
fn draw_message_line(f: &mut Frame, app: &App, area: Rect) {
    let line = if let Some((ref message, kind)) = app.message {
        let color = match kind {
            MessageKind::Success => success(),
            MessageKind::Error => danger(),
        };
        Line::from(Span::styled(message.as_str(), Style::default().fg(color)))
    } else {
        Line::from(Span::styled("Ready", Style::default().fg(text_dim())))
    };

    let banner = Paragraph::new(line).alignment(Alignment::Center);
    f.render_widget(banner, area);
}

fn draw_board(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(45), // Capability list
            Constraint::Percentage(55), // Detail panel
        ])
        .split(area);

    draw_capabilities_box(f, app, chunks[0]);
    draw_detail_box(f, app, chunks[1]);
}

fn draw_capabilities_box(f: &mut Frame, app: &App, area: Rect) {
    let is_active = app.section == Section::Capabilities;
    let border_color = if is_active { accent() } else { inactive() };
    let title_style = if is_active {
        Style::default().fg(accent()).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(inactive())
    };

    let block = Block::default()
        .title(Span::styled(" Capabilities ", title_style))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    let table_header = Row::new(vec![
        Span::styled("Name", Style::default().fg(header())),
        Span::styled("Practice", Style::default().fg(header())),
        Span::styled("h/week", Style::default().fg(header())),
        Span::styled("Team", Style::default().fg(header())),
    ]);

    let rows: Vec<Row> = if let Some(ref error) = app.load_error {
        vec![Row::new(vec![Span::styled(
            format!("  {}", error),
            Style::default().fg(danger()),
        )])]
    } else if app.capabilities.is_empty() {
        vec![Row::new(vec![Span::styled(
            "  No capabilities available",
            Style::default().fg(text_dim()),
        )])]
    } else {
        app.capabilities
            .iter()
            .enumerate()
            .map(|(i, (name, capability))| {
                let row_style = if i == app.selected && is_active {
                    Style::default().bg(bg_selected()).fg(text())
                } else {
                    Style::default()
                };

                Row::new(vec![
                    Span::styled(name.as_str(), Style::default().fg(text())),
                    Span::styled(capability.practice_label(), Style::default().fg(accent())),
                    Span::styled(
                        format!("{}", capability.capacity),
                        Style::default().fg(text_dim()),
                    ),
                    Span::styled(
                        format!("{}", capability.consultants.len()),
                        Style::default().fg(success()),
                    ),
                ])
                .style(row_style)
            })
            .collect()
    };

    let widths = vec![
        Constraint::Percentage(40),
        Constraint::Percentage(30),
        Constraint::Percentage(15),
        Constraint::Percentage(15),
    ];

    let table = Table::new(rows, widths)
        .header(table_header.style(Style::default()))
        .block(block);

    f.render_widget(table, area);
}

fn draw_detail_box(f: &mut Frame, app: &App, area: Rect) {
    let is_active = app.section == Section::Consultants;
    let border_color = if is_active { accent() } else { inactive() };
    let title_style = if is_active {
        Style::default().fg(accent()).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(inactive())
    };

    let block = Block::default()
        .title(Span::styled(" Details ", title_style))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    let Some((name, capability)) = app.selected_entry() else {
        let empty = Paragraph::new("No capability selected")
            .style(Style::default().fg(text_dim()))
            .block(block);
        f.render_widget(empty, area);
        return;
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled(name.as_str(), Style::default().fg(text()).add_modifier(Modifier::BOLD)),
            Span::raw("  "),
            Span::styled(capability.practice_label(), Style::default().fg(accent())),
        ]),
        Line::from(Span::styled(
            capability.description.as_str(),
            Style::default().fg(text_dim()),
        )),
        Line::from(""),
    ];

    if !capability.industry_verticals.is_empty() {
        lines.push(Line::from(vec![
            Span::styled("Industries: ", Style::default().fg(header())),
            Span::styled(
                capability.industry_verticals.join(", "),
                Style::default().fg(text()),
            ),
        ]));
    }
    lines.push(Line::from(vec![
        Span::styled("Capacity: ", Style::default().fg(header())),
        Span::styled(
            format!("{}h/week", capability.capacity),
            Style::default().fg(text()),
        ),
    ]));
    lines.push(Line::from(vec![
        Span::styled("Team: ", Style::default().fg(header())),
        Span::styled(
            format!("{} consultants", capability.consultants.len()),
            Style::default().fg(text()),
        ),
    ]));
    lines.push(Line::from(""));

    if capability.consultants.is_empty() {
        lines.push(Line::from(Span::styled(
            "No consultants registered yet",
            Style::default().fg(text_dim()).add_modifier(Modifier::ITALIC),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            format!("Registered Consultants ({}):", capability.consultants.len()),
            Style::default().fg(header()),
        )));
        for (i, email) in capability.consultants.iter().enumerate() {
            let row_style = if is_active && i == app.selected_consultant {
                Style::default().bg(bg_selected()).fg(text())
            } else {
                Style::default()
            };
            lines.push(
                Line::from(vec![
                    Span::styled("  ✗ ", Style::default().fg(danger())),
                    Span::styled(email.as_str(), Style::default().fg(text())),
                ])
                .style(row_style),
            );
        }
    }

    let detail = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(block);

    f.render_widget(detail, area);
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let hints: Vec<(&str, &str)> = match app.section {
        Section::Capabilities => vec![
            ("↑↓", "Nav"),
            ("r", "Register"),
            ("Tab", "Roster"),
            ("R", "Refresh"),
            ("h", "Help"),
            ("q", "Quit"),
        ],
        Section::Consultants => vec![
            ("↑↓", "Nav"),
            ("d", "Unregister"),
            ("Tab", "Board"),
            ("R", "Refresh"),
            ("h", "Help"),
        ],
    };

    // Responsive: show fewer hints on narrow terminals
    let max_hints = if area.width < 60 { 4 } else { hints.len() };

    let hint_spans: Vec<Span> = hints
        .iter()
        .take(max_hints)
        .flat_map(|(key, action)| {
            vec![
                Span::styled(*key, Style::default().fg(accent())),
                Span::styled(format!(" {} │ ", action), Style::default().fg(text_dim())),
            ]
        })
        .collect();

    let footer = Paragraph::new(Line::from(hint_spans)).alignment(Alignment::Center);
    f.render_widget(footer, area);
}

/// Rectangle of the registration modal. Shared with the mouse handler so a
/// backdrop click can be told apart from a click inside the dialog.
pub fn registration_area(area: Rect) -> Rect {
    centered_rect(
        if area.width < 80 { 90 } else { 55 },
        if area.height < 24 { 70 } else { 45 },
        area,
    )
}

fn draw_register_modal(f: &mut Frame, app: &App) {
    let popup_area = registration_area(f.area());

    f.render_widget(Clear, popup_area);

    let block = Block::default()
        .title(Span::styled(
            " Register Expertise ",
            Style::default().fg(accent()),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(accent()));

    f.render_widget(block, popup_area);

    let inner = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(2), // Target capability
            Constraint::Length(3), // Email input
            Constraint::Min(0),
            Constraint::Length(3), // Buttons
        ])
        .split(popup_area);

    let capability_line = Paragraph::new(Line::from(vec![
        Span::styled("Capability: ", Style::default().fg(header())),
        Span::styled(
            app.selected_capability.as_str(),
            Style::default().fg(text()).add_modifier(Modifier::BOLD),
        ),
    ]));
    f.render_widget(capability_line, inner[0]);

    let email_focused = app.modal_field == 0;
    let email_border = if email_focused { accent() } else { inactive() };
    let cursor = if email_focused { "_" } else { "" };
    let email_input = Paragraph::new(format!("{}{}", app.email_input, cursor))
        .style(Style::default().fg(text()))
        .block(
            Block::default()
                .title(Span::styled(
                    " Email ",
                    Style::default().fg(if email_focused { accent() } else { header() }),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(email_border)),
        );
    f.render_widget(email_input, inner[1]);

    let button_style = if app.modal_field == 1 {
        Style::default().bg(bg_selected())
    } else {
        Style::default()
    };

    let buttons = Paragraph::new(Line::from(vec![
        Span::styled("  [ ", Style::default().fg(text_dim())),
        Span::styled(
            "Enter = Register",
            Style::default().fg(success()).add_modifier(Modifier::BOLD),
        ),
        Span::styled(" ]  [ ", Style::default().fg(text_dim())),
        Span::styled("Esc = Cancel", Style::default().fg(danger())),
        Span::styled(" ]  ", Style::default().fg(text_dim())),
    ]))
    .style(button_style)
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(if app.modal_field == 1 {
                accent()
            } else {
                inactive()
            })),
    );
    f.render_widget(buttons, inner[3]);
}

fn draw_confirm_popup(f: &mut Frame, app: &App) {
    let popup_area = centered_rect(50, 20, f.area());

    f.render_widget(Clear, popup_area);

    let message = app
        .pending_unregister
        .as_ref()
        .map(|p| format!("Unregister {} from {}?", p.email, p.capability))
        .unwrap_or_else(|| "Confirm?".to_string());

    let confirm = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(message, Style::default().fg(warning()))),
        Line::from(""),
        Line::from(vec![
            Span::styled(
                "  y",
                Style::default().fg(success()).add_modifier(Modifier::BOLD),
            ),
            Span::raw(" Yes   "),
            Span::styled(
                "n",
                Style::default().fg(danger()).add_modifier(Modifier::BOLD),
            ),
            Span::raw(" No"),
        ]),
    ])
    .block(
        Block::default()
            .title(Span::styled(" Confirm ", Style::default().fg(warning())))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(warning())),
    )
    .alignment(Alignment::Center);

    f.render_widget(confirm, popup_area);
}

fn draw_help_popup(f: &mut Frame) {
    let area = f.area();
    let popup_area = centered_rect(
        if area.width < 80 { 95 } else { 60 },
        if area.height < 30 { 95 } else { 70 },
        area,
    );

    f.render_widget(Clear, popup_area);

    let help_text = vec![
        Line::from(Span::styled(
            "═══ Navigation ═══",
            Style::default().fg(header()).add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled("  Tab       ", Style::default().fg(accent())),
            Span::raw("Switch between capability list and roster"),
        ]),
        Line::from(vec![
            Span::styled("  ↑/↓ j/k   ", Style::default().fg(accent())),
            Span::raw("Move up/down in lists"),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "═══ Board Actions ═══",
            Style::default().fg(header()).add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled("  r/Enter   ", Style::default().fg(accent())),
            Span::raw("Register expertise for the selected capability"),
        ]),
        Line::from(vec![
            Span::styled("  d         ", Style::default().fg(accent())),
            Span::raw("Unregister the selected consultant (asks first)"),
        ]),
        Line::from(vec![
            Span::styled("  R         ", Style::default().fg(accent())),
            Span::raw("Re-fetch the capability list"),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "═══ Registration Modal ═══",
            Style::default().fg(header()).add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled("  Enter     ", Style::default().fg(accent())),
            Span::raw("Submit the form"),
        ]),
        Line::from(vec![
            Span::styled("  Esc       ", Style::default().fg(accent())),
            Span::raw("Cancel (outside click works too)"),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "═══ Scripting ═══",
            Style::default().fg(header()).add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled("  capboard --list                        ", Style::default().fg(accent())),
            Span::raw("JSON to stdout"),
        ]),
        Line::from(vec![
            Span::styled("  capboard --register NAME --email ADDR  ", Style::default().fg(accent())),
            Span::raw("One-shot register"),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Press ", Style::default().fg(text_dim())),
            Span::styled("h", Style::default().fg(accent())),
            Span::styled("/", Style::default().fg(text_dim())),
            Span::styled("?", Style::default().fg(accent())),
            Span::styled("/", Style::default().fg(text_dim())),
            Span::styled("Esc", Style::default().fg(accent())),
            Span::styled(" to close", Style::default().fg(text_dim())),
        ]),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .title(Span::styled(" capboard Help ", Style::default().fg(accent())))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(accent())),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
