use std::fmt;
use std::str::FromStr;

/// Grid cell, row-major with the origin in the upper left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

impl Position {
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    pub fn distance(&self, other: &Position) -> i32 {
        (self.row - other.row).abs() + (self.col - other.col).abs()
    }

    pub fn neighbors(&self) -> [Position; 4] {
        [
            self.step(Direction::N),
            self.step(Direction::S),
            self.step(Direction::W),
            self.step(Direction::E),
        ]
    }

    pub fn is_adjacent(&self, other: &Position) -> bool {
        self.distance(other) == 1
    }

    pub fn step(&self, direction: Direction) -> Position {
        let (dr, dc) = direction.delta();
        self.offset(dr, dc)
    }

    pub fn offset(&self, dr: i32, dc: i32) -> Position {
        Position::new(self.row + dr, self.col + dc)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    N,
    S,
    E,
    W,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::N, Direction::S, Direction::E, Direction::W];

    /// (row, col) displacement
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::N => (-1, 0),
            Direction::S => (1, 0),
            Direction::E => (0, 1),
            Direction::W => (0, -1),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::N => Direction::S,
            Direction::S => Direction::N,
            Direction::E => Direction::W,
            Direction::W => Direction::E,
        }
    }

    /// Direction of a single orthogonal step, `None` if the cells are not adjacent.
    pub fn between(from: Position, to: Position) -> Option<Direction> {
        Direction::ALL
            .into_iter()
            .find(|direction| from.step(*direction) == to)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Color {
    Blue,
    Red,
    Cyan,
    Purple,
    Green,
    Orange,
    Pink,
    Grey,
    Lightblue,
    Brown,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown color '{0}'")]
pub struct UnknownColor(pub String);

impl FromStr for Color {
    type Err = UnknownColor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blue" => Ok(Color::Blue),
            "red" => Ok(Color::Red),
            "cyan" => Ok(Color::Cyan),
            "purple" => Ok(Color::Purple),
            "green" => Ok(Color::Green),
            "orange" => Ok(Color::Orange),
            "pink" => Ok(Color::Pink),
            "grey" | "gray" => Ok(Color::Grey),
            "lightblue" => Ok(Color::Lightblue),
            "brown" => Ok(Color::Brown),
            other => Err(UnknownColor(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_distance_and_adjacency() {
        let a = Position::new(1, 1);
        let b = Position::new(3, 2);
        assert_eq!(a.distance(&b), 3);
        assert!(a.is_adjacent(&Position::new(1, 2)));
        assert!(!a.is_adjacent(&b));
    }

    #[test]
    fn test_direction_between() {
        let from = Position::new(2, 2);
        assert_eq!(Direction::between(from, Position::new(1, 2)), Some(Direction::N));
        assert_eq!(Direction::between(from, Position::new(2, 1)), Some(Direction::W));
        assert_eq!(Direction::between(from, Position::new(3, 3)), None);
        assert_eq!(Direction::between(from, from), None);
    }

    #[test]
    fn test_color_from_str() {
        assert_eq!("blue".parse::<Color>(), Ok(Color::Blue));
        assert_eq!(" LightBlue ".parse::<Color>(), Ok(Color::Lightblue));
        assert!("magenta".parse::<Color>().is_err());
    }
}
