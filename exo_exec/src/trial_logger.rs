//! # Trial logger
//!
//! Tab-separated record of the exercise, one row per logged event. Every row
//! is flushed as soon as it is written so a crash loses at most the row in
//! progress.
//!
//! Columns are:
//!
//! ```text
//! TIME  ITERATION  MOV  TRIGGER  left_j0..  right_j0..  l_end_pos_x/y/z  r_end_pos_x/y/z  [torso_j0..]
//! ```
//!
//! `TIME` is local wall clock time as `HH:MM:SS.mmm`, joint angles are in
//! degrees and end effector positions in millimetres.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate};
use comms_if::{
    cmd::Movement,
    eqpt::{EndEffectorPoses, JointStates, PositionMm},
};
use serde::{Deserialize, Serialize};
use util::archive::{ArchiveError, Archiver};

use crate::joints::JointLayout;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Format of the `TIME` column.
pub const TIME_FORMAT: &str = "%H:%M:%S%.3f";

/// Format of the date at the start of log file names.
pub const DATE_FORMAT: &str = "%Y_%m_%d";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Writes trial records to a delimited file.
pub struct TrialLogger<W: Write> {
    archiver: Archiver<W>,
    layout: JointLayout,
    counts: HashMap<Trigger, u64>,
}

/// One row of the trial log.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub time: DateTime<Local>,
    pub iteration: u32,
    pub movement: Movement,
    pub trigger: Trigger,
    pub states: JointStates,
    pub poses: EndEffectorPoses,
}

/// The fields which identify a run, used to name its log file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunId {
    pub subject: u32,
    pub online: bool,
    pub session: u32,
    pub run: u32,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Event which caused a record to be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trigger {
    /// The go command was received.
    Start,

    /// Periodic sample during the movement.
    Moving,

    /// The movement was stopped by the operator.
    Stop,
}

#[derive(Debug, thiserror::Error)]
pub enum TrialLogError {
    #[error("Archive error: {0}")]
    ArchiveError(#[from] ArchiveError),

    #[error("Record has {found} {group} joints but the log has {expected} columns for them")]
    WrongJointCount {
        group: &'static str,
        expected: usize,
        found: usize,
    },
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Path of the trial log for a run.
///
/// `<dir>/<YYYY_MM_DD>_sub<subject>_<on|off><session>_r<run>_log.txt`
pub fn log_file_path<P: AsRef<Path>>(dir: P, date: NaiveDate, id: &RunId) -> PathBuf {
    dir.as_ref().join(format!("{}_log.txt", id.file_prefix(date)))
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TrialLogger<File> {
    /// Create the log file, creating its directory if needed, and write the
    /// header.
    pub fn create<P: AsRef<Path>>(path: P, layout: JointLayout) -> Result<Self, TrialLogError> {
        Self::new(Archiver::create(path)?, layout)
    }
}

impl<W: Write> TrialLogger<W> {
    /// Log to an arbitrary writer, writing the header immediately.
    pub fn from_writer(writer: W, layout: JointLayout) -> Result<Self, TrialLogError> {
        Self::new(Archiver::from_writer(writer), layout)
    }

    fn new(mut archiver: Archiver<W>, layout: JointLayout) -> Result<Self, TrialLogError> {
        archiver.write_header(Self::header(layout))?;

        Ok(Self {
            archiver,
            layout,
            counts: HashMap::new(),
        })
    }

    /// Column names for the given layout.
    pub fn header(layout: JointLayout) -> Vec<String> {
        let mut cols: Vec<String> = ["TIME", "ITERATION", "MOV", "TRIGGER"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        cols.extend((0..layout.arm_joints).map(|i| format!("left_j{}", i)));
        cols.extend((0..layout.arm_joints).map(|i| format!("right_j{}", i)));
        for arm in ["l", "r"].iter() {
            for axis in ["x", "y", "z"].iter() {
                cols.push(format!("{}_end_pos_{}", arm, axis));
            }
        }
        cols.extend((0..layout.torso_joints).map(|i| format!("torso_j{}", i)));

        cols
    }

    /// Write one record and flush it.
    pub fn append(&mut self, record: &LogRecord) -> Result<(), TrialLogError> {
        self.check_len("left", record.states.left.len(), self.layout.arm_joints)?;
        self.check_len("right", record.states.right.len(), self.layout.arm_joints)?;
        if self.layout.has_torso() {
            self.check_len("torso", record.states.torso.len(), self.layout.torso_joints)?;
        }

        let mut row = vec![
            record.time.format(TIME_FORMAT).to_string(),
            record.iteration.to_string(),
            record.movement.as_char().to_string(),
            record.trigger.to_string(),
        ];

        let deg = |p: f64| format!("{:.4}", p.to_degrees());
        let mm = |p: &PositionMm| vec![
            format!("{:.3}", p.x),
            format!("{:.3}", p.y),
            format!("{:.3}", p.z),
        ];

        row.extend(record.states.left.iter().map(|s| deg(s.position_rad)));
        row.extend(record.states.right.iter().map(|s| deg(s.position_rad)));
        row.extend(mm(&record.poses.left));
        row.extend(mm(&record.poses.right));
        if self.layout.has_torso() {
            row.extend(record.states.torso.iter().map(|s| deg(s.position_rad)));
        }

        self.archiver.write_row(row)?;
        *self.counts.entry(record.trigger).or_insert(0) += 1;

        Ok(())
    }

    /// Number of records written with the given trigger.
    pub fn count(&self, trigger: Trigger) -> u64 {
        self.counts.get(&trigger).copied().unwrap_or(0)
    }

    /// Number of records written.
    pub fn num_records(&self) -> u64 {
        self.archiver.num_rows()
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> Result<W, TrialLogError> {
        Ok(self.archiver.into_inner()?)
    }

    fn check_len(&self, group: &'static str, found: usize, expected: usize) -> Result<(), TrialLogError> {
        match found == expected {
            true => Ok(()),
            false => Err(TrialLogError::WrongJointCount {
                group,
                expected,
                found,
            }),
        }
    }
}

impl RunId {
    /// `<YYYY_MM_DD>_sub<subject>_<on|off><session>_r<run>`
    pub fn file_prefix(&self, date: NaiveDate) -> String {
        format!(
            "{}_sub{}_{}{}_r{}",
            date.format(DATE_FORMAT),
            self.subject,
            if self.online { "on" } else { "off" },
            self.session,
            self.run
        )
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Start => write!(f, "START"),
            Trigger::Moving => write!(f, "MOVING"),
            Trigger::Stop => write!(f, "STOP"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;
    use comms_if::eqpt::JointState;

    fn record(layout: JointLayout, trigger: Trigger) -> LogRecord {
        let state = |p: f64| JointState { position_rad: p, torque_nm: 0.0 };

        LogRecord {
            time: Local.ymd(2024, 3, 1).and_hms_milli(9, 5, 7, 42),
            iteration: 3,
            movement: Movement::Y,
            trigger,
            states: JointStates {
                left: vec![state(std::f64::consts::PI); layout.arm_joints],
                right: vec![state(0.0); layout.arm_joints],
                torso: vec![state(-std::f64::consts::FRAC_PI_2); layout.torso_joints],
            },
            poses: EndEffectorPoses {
                left: PositionMm { x: 1.0, y: 2.0, z: 3.0 },
                right: PositionMm { x: -1.0, y: -2.0, z: -3.5 },
            },
        }
    }

    #[test]
    fn test_header() {
        let h = TrialLogger::<Vec<u8>>::header(JointLayout::new(7, 0));
        assert_eq!(h.len(), 4 + 14 + 6);
        assert_eq!(h[4], "left_j0");
        assert_eq!(h[17], "right_j6");
        assert_eq!(h[18], "l_end_pos_x");
        assert_eq!(h[23], "r_end_pos_z");

        let h = TrialLogger::<Vec<u8>>::header(JointLayout::new(7, 2));
        assert_eq!(h.last().map(|s| s.as_str()), Some("torso_j1"));
    }

    #[test]
    fn test_append() {
        let layout = JointLayout::new(2, 1);
        let mut logger = TrialLogger::from_writer(Vec::new(), layout).unwrap();

        logger.append(&record(layout, Trigger::Start)).unwrap();
        logger.append(&record(layout, Trigger::Moving)).unwrap();
        assert_eq!(logger.count(Trigger::Start), 1);
        assert_eq!(logger.count(Trigger::Stop), 0);
        assert_eq!(logger.num_records(), 2);

        let out = String::from_utf8(logger.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "TIME\tITERATION\tMOV\tTRIGGER\tleft_j0\tleft_j1\tright_j0\tright_j1\t\
             l_end_pos_x\tl_end_pos_y\tl_end_pos_z\tr_end_pos_x\tr_end_pos_y\tr_end_pos_z\ttorso_j0"
        );
        assert_eq!(
            lines[1],
            "09:05:07.042\t3\ty\tSTART\t180.0000\t180.0000\t0.0000\t0.0000\t\
             1.000\t2.000\t3.000\t-1.000\t-2.000\t-3.500\t-90.0000"
        );
        assert!(lines[2].contains("\tMOVING\t"));
    }

    #[test]
    fn test_wrong_joint_count() {
        let mut logger = TrialLogger::from_writer(Vec::new(), JointLayout::new(7, 0)).unwrap();
        let bad = record(JointLayout::new(6, 0), Trigger::Stop);

        assert!(matches!(
            logger.append(&bad),
            Err(TrialLogError::WrongJointCount { group: "left", expected: 7, found: 6 })
        ));
    }

    #[test]
    fn test_log_file_path() {
        let id = RunId {
            subject: 4,
            online: false,
            session: 2,
            run: 7,
        };
        let date = NaiveDate::from_ymd(2024, 3, 1);

        assert_eq!(
            log_file_path("log", date, &id),
            PathBuf::from("log/2024_03_01_sub4_off2_r7_log.txt")
        );
        assert_eq!(
            RunId { online: true, ..id }.file_prefix(date),
            "2024_03_01_sub4_on2_r7"
        );
    }
}
