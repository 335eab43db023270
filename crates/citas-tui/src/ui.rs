use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};
use citas_core::calendar::{CalendarCell, MONTH_NAMES, WEEKDAY_LABELS};
use citas_core::{Author, CalendarState, CalendarView};
use chrono::Datelike;
use crate::app::{App, FocusPane};

const CALENDAR_HEIGHT: u16 = 12;

pub fn render(app: &mut App, frame: &mut Frame) {
    if app.session.is_open() {
        render_widget(app, frame);
    } else {
        render_launcher(app, frame);
    }
}

/// Closed or minimized: just the floating button in the corner.
fn render_launcher(app: &App, frame: &mut Frame) {
    let area = frame.area();

    let hint = Paragraph::new(vec![
        Line::from(Span::styled(
            "Asistente legal",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "Reserva tu cita con el despacho.",
            Style::default().fg(Color::DarkGray),
        )),
    ])
    .alignment(Alignment::Center);
    let [hint_area] = Layout::vertical([Constraint::Length(2)])
        .flex(Flex::Center)
        .areas(area);
    frame.render_widget(hint, hint_area);

    let label = if app.session.is_minimized() {
        " Continuar conversación "
    } else {
        " Pedir cita "
    };
    let width = (label.chars().count() as u16 + 2).min(area.width);
    let height = 3.min(area.height);
    let button_area = Rect::new(
        area.x + area.width.saturating_sub(width + 1),
        area.y + area.height.saturating_sub(height + 1),
        width,
        height,
    );

    let button = Paragraph::new(Span::styled(
        label,
        Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD),
    ))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title_bottom(" Enter "),
    );
    frame.render_widget(Clear, button_area);
    frame.render_widget(button, button_area);
}

fn render_widget(app: &mut App, frame: &mut Frame) {
    let choices_height = app
        .session
        .transcript()
        .choices()
        .map(|g| g.options().len() as u16 + 2)
        .unwrap_or(0);
    let calendar_height = if app.session.calendar().is_some() {
        CALENDAR_HEIGHT
    } else {
        0
    };

    let [header_area, chat_area, choices_area, calendar_area, input_area, footer_area] =
        Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(choices_height),
            Constraint::Length(calendar_height),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .areas(frame.area());

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            " Asistente legal ",
            Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" {}", app.session.context().visitor_id()),
            Style::default().fg(Color::DarkGray),
        ),
    ]));
    frame.render_widget(header, header_area);

    render_chat(app, frame, chat_area);
    if choices_height > 0 {
        render_choices(app, frame, choices_area);
    }
    if let Some(view) = app.session.calendar() {
        render_calendar(view, app, frame, calendar_area);
    }
    render_input(app, frame, input_area);

    let help = match app.focus {
        FocusPane::Input => "Enter enviar · Tab cambiar panel · Esc minimizar · Ctrl-C salir",
        FocusPane::Choices => "↑/↓ elegir · Enter o 1-9 pulsar · Tab cambiar panel · Esc volver",
        FocusPane::Calendar => "Flechas moverse · </> mes · Enter reservar · Tab cambiar panel · Esc volver",
    };
    frame.render_widget(
        Paragraph::new(help).style(Style::default().fg(Color::DarkGray)),
        footer_area,
    );
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    // Store the viewport so scrolling can account for wrapping
    app.chat_width = area.width.saturating_sub(2);
    app.chat_height = area.height.saturating_sub(2);
    app.scroll_chat_to_bottom();

    let choices = app.session.transcript().choices();
    let mut lines: Vec<Line> = Vec::new();
    for (index, entry) in app.session.transcript().entries().iter().enumerate() {
        let (label, color, alignment) = match entry.author {
            Author::User => ("Tú", Color::Cyan, Alignment::Right),
            Author::Assistant => ("Asistente", Color::Yellow, Alignment::Left),
        };
        lines.push(
            Line::from(Span::styled(
                label,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ))
            .alignment(alignment),
        );
        for text_line in entry.text.lines() {
            let style = match entry.author {
                Author::User => Style::default().fg(Color::Cyan),
                Author::Assistant => Style::default(),
            };
            lines.push(Line::from(Span::styled(text_line.to_string(), style)).alignment(alignment));
        }
        // Point the visitor at the buttons that belong to this bubble
        if let Some(group) = choices.filter(|g| g.anchor() == index) {
            lines.push(Line::from(Span::styled(
                format!("↳ {} opciones abajo (Tab)", group.options().len()),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
            )));
        }
        lines.push(Line::from(""));
    }

    if app.session.is_awaiting_reply() {
        lines.push(Line::from(Span::styled(
            "Asistente",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Escribiendo{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, area);
}

fn render_choices(app: &App, frame: &mut Frame, area: Rect) {
    let Some(group) = app.session.transcript().choices() else {
        return;
    };
    let focused = app.focus == FocusPane::Choices;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Opciones (Tab para elegir) ");

    let items: Vec<ListItem> = group
        .options()
        .iter()
        .enumerate()
        .map(|(i, option)| ListItem::new(format!(" {}. {} ", i + 1, option)))
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Cyan)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    if focused {
        state.select(Some(app.choice_cursor));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_calendar(view: &CalendarView, app: &App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Calendar;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    let displayed = view.displayed_month();
    let month_name = MONTH_NAMES
        .get(displayed.month0() as usize)
        .copied()
        .unwrap_or_default();
    let mut title = format!(" < {} {} > ", month_name, displayed.year());
    if let Some(kind) = view.meeting_type() {
        title.push_str(&format!("· {} ({} min) ", kind.display_name(), kind.duration_minutes()));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let grid = match view.state() {
        Some(CalendarState::Grid(grid)) => grid,
        _ => {
            let prompt = Paragraph::new(app.session.config().missing_meeting_type_prompt.as_str())
                .style(Style::default().fg(Color::Yellow))
                .wrap(Wrap { trim: true })
                .block(block);
            frame.render_widget(prompt, area);
            return;
        }
    };

    let mut lines: Vec<Line> = Vec::new();
    lines.push(Line::from(
        WEEKDAY_LABELS
            .iter()
            .map(|label| {
                Span::styled(
                    format!("{:>4} ", label),
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD),
                )
            })
            .collect::<Vec<_>>(),
    ));

    for row in grid.rows() {
        let spans: Vec<Span> = row
            .iter()
            .map(|cell| {
                let selected = focused && app.calendar_cursor == Some(cell.date);
                Span::styled(format!("{:>4} ", cell.date.day()), cell_style(cell, selected))
            })
            .collect();
        lines.push(Line::from(spans));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("  ", Style::default().bg(Color::Green)),
        Span::raw(" Días con disponibilidad   "),
        Span::styled("  ", Style::default().bg(Color::DarkGray)),
        Span::raw(" Días sin disponibilidad"),
    ]));
    let instruction = if grid.available_count() == 0 {
        "No quedan días libres este mes. Prueba con el siguiente."
    } else {
        "Elige un día disponible (verde) y pulsa Enter."
    };
    lines.push(Line::from(Span::styled(
        instruction,
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
    )));

    frame.render_widget(Paragraph::new(Text::from(lines)).block(block), area);
}

fn cell_style(cell: &CalendarCell, selected: bool) -> Style {
    let mut style = if !cell.in_current_month {
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM)
    } else if cell.is_available {
        Style::default().fg(Color::Black).bg(Color::Green).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    if cell.is_today {
        style = style.add_modifier(Modifier::UNDERLINED);
    }
    if selected {
        style = style.add_modifier(Modifier::REVERSED);
    }
    style
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let awaiting = app.session.is_awaiting_reply();
    let focused = app.focus == FocusPane::Input;
    let border_color = if awaiting {
        Color::DarkGray
    } else if focused {
        Color::Yellow
    } else {
        Color::Gray
    };
    let title = if awaiting {
        " Esperando respuesta... "
    } else {
        " Escribe tu mensaje "
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Calculate visible portion of input with horizontal scrolling
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.input_cursor;
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let text_color = if awaiting { Color::DarkGray } else { Color::Cyan };
    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(text_color))
        .block(input_block);
    frame.render_widget(input, area);

    if focused && !awaiting {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}
