//! Reader for the hospital server's level format.
//!
//! ```text
//! #domain / #levelname / #colors / #initial / #goal / #end
//! ```
//! `#colors` lines look like `blue: 0, A, B`. In the grids `+` is a wall,
//! digits are agents and capital letters are boxes (or goals, in `#goal`).

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::infra::{Color, LevelError, Position};
use crate::state::{Agent, BoxEntity, Goal, GoalKind, Level, WorldState};

/// Parses a complete level text into the root world state.
pub fn parse_level(text: &str) -> Result<WorldState, LevelError> {
    let sections = split_sections(text);

    let name = section(&sections, "#levelname")?
        .first()
        .map(|line| line.trim().to_string())
        .unwrap_or_default();
    let colors = parse_colors(section(&sections, "#colors")?)?;
    let initial = section(&sections, "#initial")?;
    let goal_rows = section(&sections, "#goal")?;

    let rows = initial.len();
    let cols = initial.iter().map(|line| line.chars().count()).max().unwrap_or(0);
    let goal_cols = goal_rows.iter().map(|line| line.chars().count()).max().unwrap_or(0);
    if goal_rows.len() != rows || goal_cols > cols {
        return Err(LevelError::GridMismatch {
            rows,
            cols,
            goal_rows: goal_rows.len(),
            goal_cols,
        });
    }

    let mut walls = vec![false; rows * cols];
    let mut agents = Vec::new();
    let mut boxes = Vec::new();
    let mut initial_agents = BTreeMap::new();

    for (row, line) in initial.iter().enumerate() {
        for (col, symbol) in line.chars().enumerate() {
            let pos = Position::new(row as i32, col as i32);
            match symbol {
                '+' => walls[row * cols + col] = true,
                ' ' => {}
                '0'..='9' => {
                    let id = symbol as usize - '0' as usize;
                    let color = color_for(&colors, symbol)?;
                    agents.push(Agent::new(id, color, pos));
                    initial_agents.insert(id, pos);
                }
                'A'..='Z' => {
                    let color = color_for(&colors, symbol)?;
                    boxes.push(BoxEntity::new(boxes.len(), symbol, color, pos));
                }
                _ => return Err(LevelError::InvalidSymbol { symbol, position: pos }),
            }
        }
    }

    if agents.is_empty() {
        return Err(LevelError::NoAgents);
    }

    let mut goals = Vec::new();
    for (row, line) in goal_rows.iter().enumerate() {
        for (col, symbol) in line.chars().enumerate() {
            let pos = Position::new(row as i32, col as i32);
            let kind = match symbol {
                '+' | ' ' => continue,
                '0'..='9' => GoalKind::Agent(symbol as usize - '0' as usize),
                'A'..='Z' => GoalKind::Box(symbol),
                _ => return Err(LevelError::InvalidSymbol { symbol, position: pos }),
            };
            goals.push(Goal::new(goals.len(), kind, pos));
        }
    }

    let level = Level::new(name, rows, cols, walls, colors, goals, initial_agents);
    Ok(WorldState::new(Rc::new(level), agents, boxes))
}

fn split_sections(text: &str) -> BTreeMap<&str, Vec<&str>> {
    let mut sections: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    let mut current = None;
    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if line.starts_with('#') {
            let header = line.trim();
            if header == "#end" {
                break;
            }
            sections.entry(header).or_default();
            current = Some(header);
        } else if let Some(header) = current {
            sections.entry(header).or_default().push(line);
        }
    }
    sections
}

fn section<'a>(
    sections: &'a BTreeMap<&str, Vec<&'a str>>,
    name: &'static str,
) -> Result<&'a [&'a str], LevelError> {
    sections
        .get(name)
        .map(Vec::as_slice)
        .ok_or(LevelError::MissingSection(name))
}

fn parse_colors(lines: &[&str]) -> Result<BTreeMap<char, Color>, LevelError> {
    let mut colors = BTreeMap::new();
    for line in lines.iter().filter(|line| !line.trim().is_empty()) {
        let (color, entities) = line
            .split_once(':')
            .ok_or_else(|| LevelError::InvalidColorLine(line.to_string()))?;
        let color: Color = color.parse()?;
        for entity in entities.split(',') {
            let mut chars = entity.trim().chars();
            match (chars.next(), chars.next()) {
                (Some(symbol), None) => {
                    colors.insert(symbol, color);
                }
                _ => return Err(LevelError::InvalidColorLine(line.to_string())),
            }
        }
    }
    Ok(colors)
}

fn color_for(colors: &BTreeMap<char, Color>, symbol: char) -> Result<Color, LevelError> {
    colors
        .get(&symbol)
        .copied()
        .ok_or(LevelError::Uncolored(symbol))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LEVEL: &str = "\
#domain
hospital
#levelname
SAExample
#colors
blue: 0, A
red: 1, B
#initial
+++++++
+0 A  +
+1  B +
+++++++
#goal
+++++++
+    A+
+ 1  B+
+++++++
#end
";

    #[test]
    fn test_parse_level() {
        let state = parse_level(LEVEL).unwrap();
        let level = state.level();
        assert_eq!(level.name, "SAExample");
        assert_eq!((level.rows(), level.cols()), (4, 7));
        assert!(level.is_wall(Position::new(0, 3)));
        assert!(!level.is_wall(Position::new(1, 2)));

        assert_eq!(state.agents().len(), 2);
        assert_eq!(state.agent(1).map(|a| (a.color, a.pos)), Some((Color::Red, Position::new(2, 1))));
        assert_eq!(level.initial_location(0), Some(Position::new(1, 1)));

        let boxes: Vec<_> = state.boxes().map(|b| (b.id, b.letter, b.color)).collect();
        assert_eq!(boxes, vec![(0, 'A', Color::Blue), (1, 'B', Color::Red)]);

        let goals: Vec<_> = state.goals().iter().map(|g| (g.kind, g.pos)).collect();
        assert_eq!(
            goals,
            vec![
                (GoalKind::Box('A'), Position::new(1, 5)),
                (GoalKind::Agent(1), Position::new(2, 2)),
                (GoalKind::Box('B'), Position::new(2, 5)),
            ]
        );
    }

    #[test]
    fn test_missing_section() {
        let text = LEVEL.replace("#goal", "#goals");
        assert_eq!(parse_level(&text).unwrap_err(), LevelError::MissingSection("#goal"));
    }

    #[test]
    fn test_uncolored_box() {
        let text = LEVEL.replace("red: 1, B", "red: 1");
        assert_eq!(parse_level(&text).unwrap_err(), LevelError::Uncolored('B'));
    }

    #[test]
    fn test_unknown_color() {
        let text = LEVEL.replace("red:", "magenta:");
        assert!(matches!(
            parse_level(&text),
            Err(LevelError::UnknownColor(_))
        ));
    }
}
