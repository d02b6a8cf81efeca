use crate::notebook::{Cell, CellKind};

// @module: Cell classifier and router state machine

/// Pipeline a cell is dispatched to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Markdown,
    Code,
    /// Unknown kinds (raw cells, future kinds) are copied unchanged
    PassThrough,
}

impl Route {
    /// Route for a cell's declared kind
    pub fn for_cell(cell: &Cell) -> Self {
        match cell.kind() {
            CellKind::Markdown => Self::Markdown,
            CellKind::Code => Self::Code,
            CellKind::Other(_) => Self::PassThrough,
        }
    }
}

/// Router states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterState {
    /// Nothing inspected yet
    Start,
    /// The cursor points at an unprocessed cell
    HasNextCell,
    /// The cell at the cursor was handed to a pipeline
    Dispatched(Route),
    /// Every cell was dispatched; terminal
    Exhausted,
}

/// One routing decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatch {
    /// Position of the cell in the document
    pub index: usize,
    pub route: Route,
}

/// Walks a cell sequence in document order, one transition at a time
#[derive(Debug)]
pub struct CellRouter<'a> {
    cells: &'a [Cell],
    cursor: usize,
    state: RouterState,
}

impl<'a> CellRouter<'a> {
    pub fn new(cells: &'a [Cell]) -> Self {
        Self {
            cells,
            cursor: 0,
            state: RouterState::Start,
        }
    }

    pub fn state(&self) -> RouterState {
        self.state
    }

    /// Index of the cell being, or about to be, dispatched
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn after_cursor_moved(&self) -> RouterState {
        if self.cursor < self.cells.len() {
            RouterState::HasNextCell
        } else {
            RouterState::Exhausted
        }
    }

    /// Perform a single transition and return the new state.
    ///
    /// Leaving `Dispatched` marks that dispatch complete and advances the cursor.
    pub fn step(&mut self) -> RouterState {
        self.state = match self.state {
            RouterState::Start => self.after_cursor_moved(),
            RouterState::HasNextCell => RouterState::Dispatched(Route::for_cell(&self.cells[self.cursor])),
            RouterState::Dispatched(_) => {
                self.cursor += 1;
                self.after_cursor_moved()
            }
            RouterState::Exhausted => RouterState::Exhausted,
        };
        self.state
    }
}

impl Iterator for CellRouter<'_> {
    type Item = Dispatch;

    fn next(&mut self) -> Option<Dispatch> {
        loop {
            match self.step() {
                RouterState::Dispatched(route) => {
                    return Some(Dispatch {
                        index: self.cursor,
                        route,
                    });
                }
                RouterState::Exhausted => return None,
                RouterState::Start | RouterState::HasNextCell => continue,
            }
        }
    }
}
