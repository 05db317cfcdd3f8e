use crate::model::width_mask;
use crate::native::{Design, PortDecl};

pub const CLK: usize = 0;
pub const RST: usize = 1;
pub const LOAD: usize = 2;
pub const LOAD_VALUE: usize = 3;
pub const EN: usize = 4;
pub const COUNT: usize = 5;

/// Behavioral rendition of `counter.v`: synchronous reset, parallel load and
/// count enable, in that priority, on the rising clock edge.
#[derive(Debug, Clone)]
pub struct CounterRtl {
    width: u32,
    mask: u64,
}

impl CounterRtl {
    pub fn new(width: u32) -> Self {
        Self {
            width,
            mask: width_mask(width),
        }
    }
}

impl Default for CounterRtl {
    fn default() -> Self {
        Self::new(8)
    }
}

impl Design for CounterRtl {
    fn name(&self) -> &str {
        "counter"
    }

    fn ports(&self) -> Vec<PortDecl> {
        vec![
            PortDecl::input("clk", 1),
            PortDecl::input("rst", 1),
            PortDecl::input("load", 1),
            PortDecl::input("load_value", self.width),
            PortDecl::input("en", 1),
            PortDecl::output("count", self.width),
        ]
    }

    fn clock(&self) -> usize {
        CLK
    }

    fn posedge(&mut self, values: &[Option<u64>]) -> Vec<(usize, Option<u64>)> {
        // an undefined condition takes the else branch, like `if (x)` in Verilog
        let asserted = |port: usize| values.get(port).copied().flatten().map_or(false, |v| v != 0);
        let count = values.get(COUNT).copied().flatten();
        let next = if asserted(RST) {
            Some(0)
        } else if asserted(LOAD) {
            values.get(LOAD_VALUE).copied().flatten().map(|v| v & self.mask)
        } else if asserted(EN) {
            count.map(|c| c.wrapping_add(1) & self.mask)
        } else {
            count
        };
        vec![(COUNT, next)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(rtl: &mut CounterRtl, rst: Option<u64>, load: Option<u64>, load_value: Option<u64>, en: Option<u64>, count: Option<u64>) -> Option<u64> {
        let values = [Some(1), rst, load, load_value, en, count];
        rtl.posedge(&values)[0].1
    }

    #[test]
    fn undefined_count_stays_undefined_until_reset() {
        let mut rtl = CounterRtl::default();
        assert_eq!(edge(&mut rtl, None, None, None, Some(1), None), None);
        assert_eq!(edge(&mut rtl, Some(1), None, None, Some(1), None), Some(0));
    }

    #[test]
    fn priority_and_wrap() {
        let mut rtl = CounterRtl::new(8);
        assert_eq!(edge(&mut rtl, Some(1), Some(1), Some(9), Some(1), Some(3)), Some(0));
        assert_eq!(edge(&mut rtl, Some(0), Some(1), Some(0x1ff), Some(1), Some(3)), Some(0xff));
        assert_eq!(edge(&mut rtl, Some(0), Some(0), Some(9), Some(1), Some(0xff)), Some(0));
        assert_eq!(edge(&mut rtl, Some(0), Some(0), Some(9), Some(0), Some(7)), Some(7));
    }
}
