use crate::core::color::Color;

/// Grid coordinates of a pixel, used as a non-owning handle into the
/// shared pixel grid. Connections never hold references to their peers.
pub type PixelCoord = (u32, u32);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Up to four directional links to adjacent pixels of matching color.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct PixelConnections {
    up: Option<PixelCoord>,
    down: Option<PixelCoord>,
    left: Option<PixelCoord>,
    right: Option<PixelCoord>,
}

impl PixelConnections {
    pub fn get(&self, direction: Direction) -> Option<PixelCoord> {
        match direction {
            Direction::Up => self.up,
            Direction::Down => self.down,
            Direction::Left => self.left,
            Direction::Right => self.right,
        }
    }

    pub fn set(&mut self, direction: Direction, coord: PixelCoord) {
        match direction {
            Direction::Up => self.up = Some(coord),
            Direction::Down => self.down = Some(coord),
            Direction::Left => self.left = Some(coord),
            Direction::Right => self.right = Some(coord),
        }
    }

    pub fn clear(&mut self) {
        *self = PixelConnections::default();
    }

    pub fn is_connected(&self) -> bool {
        self.up.is_some() || self.down.is_some() || self.left.is_some() || self.right.is_some()
    }

    pub fn is_connected_in(&self, direction: Direction) -> bool {
        self.get(direction).is_some()
    }
}

/// One cell of a pixel grid: a color plus links to equal-colored neighbors.
#[derive(Clone, Debug)]
pub struct ImagePixel {
    color: Color,
    connections: PixelConnections,
}

impl ImagePixel {
    pub fn new(color: Color) -> Self {
        ImagePixel {
            color,
            connections: PixelConnections::default(),
        }
    }

    pub fn color(&self) -> Color {
        self.color
    }

    /// Recolors the pixel. Links are only valid between equal colors, so
    /// this resets all connections; callers rebuild them afterwards.
    pub fn set_color(&mut self, color: Color) {
        self.connections.clear();
        self.color = color;
    }

    pub fn connections(&self) -> &PixelConnections {
        &self.connections
    }

    pub fn connections_mut(&mut self) -> &mut PixelConnections {
        &mut self.connections
    }
}
