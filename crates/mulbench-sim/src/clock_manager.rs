use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEdge {
    None,
    Rising,
    Falling,
}

#[derive(Debug, Clone)]
pub struct ClockInfo {
    pub name: String,
    pub current_value: bool,
    pub previous_value: bool,
    pub rising_edges: u64,
}

impl ClockInfo {
    pub fn new(name: String) -> Self {
        ClockInfo {
            name,
            current_value: false,
            previous_value: false,
            rising_edges: 0,
        }
    }

    pub fn detect_edge(&self) -> ClockEdge {
        match (self.previous_value, self.current_value) {
            (false, true) => ClockEdge::Rising,
            (true, false) => ClockEdge::Falling,
            _ => ClockEdge::None,
        }
    }

    pub fn update(&mut self, new_value: bool) {
        self.previous_value = self.current_value;
        self.current_value = new_value;
        if self.detect_edge() == ClockEdge::Rising {
            self.rising_edges += 1;
        }
    }
}

#[derive(Debug, Default)]
pub struct ClockManager {
    clocks: IndexMap<String, ClockInfo>,
}

impl ClockManager {
    pub fn new() -> Self {
        ClockManager {
            clocks: IndexMap::new(),
        }
    }

    /// Inputs named like a clock are treated as one
    pub fn is_clock_name(name: &str) -> bool {
        let lower = name.to_ascii_lowercase();
        lower.contains("clk") || lower.contains("clock")
    }

    pub fn add_clock(&mut self, name: String) {
        self.clocks.insert(name.clone(), ClockInfo::new(name));
    }

    /// Record the sampled level of a clock and report the edge it produced
    pub fn set_clock(&mut self, name: &str, value: bool) -> Option<ClockEdge> {
        self.clocks.get_mut(name).map(|clock| {
            clock.update(value);
            clock.detect_edge()
        })
    }

    pub fn get_clock_value(&self, name: &str) -> Option<bool> {
        self.clocks.get(name).map(|c| c.current_value)
    }

    pub fn rising_edges(&self, name: &str) -> u64 {
        self.clocks.get(name).map_or(0, |c| c.rising_edges)
    }

    pub fn clock_names(&self) -> Vec<String> {
        self.clocks.keys().cloned().collect()
    }
}
