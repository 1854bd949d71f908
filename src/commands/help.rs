//! Help text for the interactive prompt

/// Returns the help text for all prompt commands
pub fn get_help_text() -> &'static str {
    "Available commands:
  LS [path]              - List directory contents (parsed)
  NLST [path]            - List file names only
  GET <remote> [local]   - Download a file (resumes if enabled)
  PUT <local> [remote]   - Upload a file (resumes if enabled)
  CD <directory>         - Change working directory
  CDUP                   - Change to parent directory
  PWD                    - Print working directory
  MKD <directory>        - Create directory on server
  RMD <directory>        - Remove directory on server
  DELE <file>            - Delete file on server
  RENAME <from> <to>     - Rename or move a file
  SIZE <file>            - Show remote file size
  MDTM <file>            - Show remote modification time
  SYST                   - Show server system type
  NOOP                   - Keep the connection alive
  HELP                   - Show this help message
  QUIT                   - Disconnect and exit"
}
