use crate::topology::PortRef;
use crate::topology::bandwidth::Bandwidth;

/// A virtual link between two ports
///
/// The first port plugged in becomes the upper end, the second one the lower end. The limit
/// declared along with one end constrains the traffic flowing towards the other end, so it is
/// stored in the other end's downlink slot.
#[derive(Debug, Clone, Default)]
pub struct Cable {
    pub(crate) upper: Option<PortRef>,
    pub(crate) lower: Option<PortRef>,
    pub(crate) upper_downlink: Option<Bandwidth>,
    pub(crate) lower_downlink: Option<Bandwidth>,
}

/// Which end of a cable a port got plugged into
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CableEnd {
    Upper,
    Lower,
}

impl Cable {
    pub fn upper(&self) -> Option<PortRef> {
        self.upper
    }

    pub fn lower(&self) -> Option<PortRef> {
        self.lower
    }

    /// Rate limit for traffic towards the upper end, declared with the lower end
    pub fn upper_downlink(&self) -> Option<&Bandwidth> {
        self.upper_downlink.as_ref()
    }

    /// Rate limit for traffic towards the lower end, declared with the upper end
    pub fn lower_downlink(&self) -> Option<&Bandwidth> {
        self.lower_downlink.as_ref()
    }

    /// Both ends, if the cable is fully wired
    pub fn ends(&self) -> Option<(PortRef, PortRef)> {
        Some((self.upper?, self.lower?))
    }

    /// Plugs `port` into the first free end
    ///
    /// Returns `None` if both ends are taken, in which case the cable is left untouched.
    pub(crate) fn attach(&mut self, port: PortRef, limit: Option<Bandwidth>) -> Option<CableEnd> {
        match (self.upper, self.lower) {
            (None, _) => {
                self.upper = Some(port);
                self.lower_downlink = limit;
                Some(CableEnd::Upper)
            }
            (Some(_), None) => {
                self.lower = Some(port);
                self.upper_downlink = limit;
                Some(CableEnd::Lower)
            }
            (Some(_), Some(_)) => None,
        }
    }
}
