//! File intake
//!
//! Decides whether a dropped or picked file can enter the workflow and which
//! lane it follows. The lane is fixed here and carried on the intake so no
//! later stage has to re-derive it from the file name.

mod validator;

pub use validator::{
    extension_of, file_stem_of, CandidateFile, FileIntake, FileIntakeValidator, Lane, Rejection,
    ACCEPTED_EXTENSIONS, SUPPORTED_MEDIA_TYPES,
};
